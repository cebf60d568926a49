use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::RequestBuilder;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag an outgoing BECS request with a correlation id and our user agent.
/// With `soap_action` set, the request also gets the SOAP 1.1 content type
/// and action. Returns the builder and the request id for logging.
pub fn becs_request(builder: RequestBuilder, soap_action: Option<&str>) -> (RequestBuilder, String) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let rid = format!("becs-{}-{}", now.as_secs(), now.subsec_nanos());
    let mut b = builder
        .header("x-request-id", rid.as_str())
        .header(USER_AGENT, concat!("becs-tree-query/", env!("CARGO_PKG_VERSION")));
    if let Some(op) = soap_action {
        b = b
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", op));
    }
    (b, rid)
}
