//! SOAP 1.1 envelope writing and response decoding for the BECS ExtAPI.
//!
//! Responses are decoded into an untyped JSON tree: the caller only ever
//! re-serializes it, so no schema is applied beyond what `xsi:type` says.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use thiserror::Error;

pub const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const DEFAULT_NAMESPACE: &str = "urn:packetfront_becs";

#[derive(Debug, Error)]
pub enum SoapError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("upstream status {0}")]
    Status(u16),
    #[error("soap fault {code}: {message}")]
    Fault { code: String, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("rejected (err {code}): {message}")]
    Rejected { code: String, message: String },
}

/// Build a request envelope. `params` end up inside a single `in` part.
pub fn envelope(
    namespace: &str,
    operation: &str,
    session_id: Option<&str>,
    params: &[(&str, String)],
) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push_str(&format!(
        r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="{}" xmlns:ns1="{}">"#,
        ENVELOPE_NS,
        escape(namespace)
    ));
    if let Some(sid) = session_id {
        out.push_str(&format!(
            "<SOAP-ENV:Header><ns1:request><sessionid>{}</sessionid></ns1:request></SOAP-ENV:Header>",
            escape(sid)
        ));
    }
    out.push_str(&format!("<SOAP-ENV:Body><ns1:{}>", operation));
    if params.is_empty() {
        out.push_str("<in/>");
    } else {
        out.push_str("<in>");
        for (name, value) in params {
            out.push_str(&format!("<{0}>{1}</{0}>", name, escape(value.as_str())));
        }
        out.push_str("</in>");
    }
    out.push_str(&format!(
        "</ns1:{}></SOAP-ENV:Body></SOAP-ENV:Envelope>",
        operation
    ));
    out
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == local)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == local)
    }

    fn find(&self, local: &str) -> Option<&Node> {
        if self.name == local {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(local))
    }
}

fn local(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn open(e: &BytesStart<'_>) -> Result<Node, SoapError> {
    let mut node = Node {
        name: local(e.local_name().as_ref()),
        ..Node::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SoapError::Malformed(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SoapError::Malformed(e.to_string()))?;
        node.attrs
            .push((local(attr.key.local_name().as_ref()), value.into_owned()));
    }
    Ok(node)
}

fn parse_document(xml: &str) -> Result<Node, SoapError> {
    // Text is kept raw; whitespace between child elements is dropped in `node_value`.
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(open(&e)?),
            Ok(Event::Empty(e)) => {
                let node = open(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(cur) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| SoapError::Malformed(e.to_string()))?;
                    cur.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(cur) = stack.last_mut() {
                    cur.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SoapError::Malformed("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SoapError::Malformed(e.to_string())),
        }
    }
    if !stack.is_empty() {
        return Err(SoapError::Malformed("unexpected end of document".into()));
    }
    root.ok_or_else(|| SoapError::Malformed("empty document".into()))
}

/// Decode a response envelope into the JSON value of the operation's result.
///
/// Faults are returned as errors whatever the HTTP status was.
pub fn decode_response(xml: &str) -> Result<Value, SoapError> {
    let doc = parse_document(xml)?;
    if doc.name != "Envelope" {
        return Err(SoapError::Malformed(format!(
            "expected Envelope, got {}",
            doc.name
        )));
    }
    let body = doc
        .child("Body")
        .ok_or_else(|| SoapError::Malformed("missing Body".into()))?;
    let response = body
        .children
        .first()
        .ok_or_else(|| SoapError::Malformed("empty Body".into()))?;

    if response.name == "Fault" {
        let field = |n: &str| {
            response
                .child(n)
                .map(|c| c.text.clone())
                .unwrap_or_default()
        };
        return Err(SoapError::Fault {
            code: field("faultcode"),
            message: field("faultstring"),
        });
    }

    let value = match response.children.as_slice() {
        [] => Value::Null,
        [part] => node_value(part),
        _ => node_value(response),
    };
    check_err(&value)?;
    Ok(value)
}

/// BECS reports application errors in-band as a non-zero `err` field.
fn check_err(value: &Value) -> Result<(), SoapError> {
    let Some(err) = value.get("err") else {
        return Ok(());
    };
    let code = match err {
        Value::Null => return Ok(()),
        Value::Number(n) if n.as_i64() == Some(0) => return Ok(()),
        Value::String(s) if s.is_empty() || s == "0" => return Ok(()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let message = value
        .get("errtxt")
        .and_then(Value::as_str)
        .unwrap_or("no error text")
        .to_string();
    Err(SoapError::Rejected { code, message })
}

fn is_array(node: &Node) -> bool {
    if node.attr("arrayType").is_some() {
        return true;
    }
    node.attr("type")
        .map(|t| type_local(t).ends_with("Array"))
        .unwrap_or(false)
}

fn type_local(t: &str) -> &str {
    t.rsplit(':').next().unwrap_or(t)
}

fn node_value(node: &Node) -> Value {
    if node.attr("nil") == Some("true") {
        return Value::Null;
    }
    if is_array(node) {
        return Value::Array(node.children.iter().map(node_value).collect());
    }
    if !node.children.is_empty() {
        let mut map = Map::new();
        let mut repeated: HashSet<&str> = HashSet::new();
        for child in &node.children {
            let v = node_value(child);
            match map.get_mut(&child.name) {
                None => {
                    map.insert(child.name.clone(), v);
                }
                Some(existing) => {
                    if repeated.insert(child.name.as_str()) {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, v]);
                    } else if let Value::Array(items) = existing {
                        items.push(v);
                    }
                }
            }
        }
        return Value::Object(map);
    }
    let xsi_type = node.attr("type").map(type_local);
    if xsi_type == Some("string") {
        return Value::String(node.text.clone());
    }
    if node.text.trim().is_empty() {
        return Value::Null;
    }
    scalar(&node.text, xsi_type)
}

fn scalar(text: &str, xsi_type: Option<&str>) -> Value {
    let as_string = || Value::String(text.to_string());
    match xsi_type {
        Some(
            "int" | "integer" | "long" | "short" | "byte" | "negativeInteger"
            | "nonPositiveInteger",
        ) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| as_string()),
        Some(
            "unsignedInt" | "unsignedLong" | "unsignedShort" | "unsignedByte"
            | "nonNegativeInteger" | "positiveInteger",
        ) => text
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| as_string()),
        Some("boolean") => match text.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => as_string(),
        },
        Some("float" | "double" | "decimal") => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(as_string),
        Some(_) => as_string(),
        None => match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => Value::from(n),
            _ => as_string(),
        },
    }
}

/// Service location details read from a WSDL document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WsdlInfo {
    pub endpoint: Option<String>,
    pub namespace: Option<String>,
}

pub fn parse_wsdl(xml: &str) -> Result<WsdlInfo, SoapError> {
    let doc = parse_document(xml)?;
    if doc.name != "definitions" {
        return Err(SoapError::Malformed(format!(
            "expected WSDL definitions, got {}",
            doc.name
        )));
    }
    let endpoint = doc
        .find("service")
        .and_then(|svc| svc.find("address"))
        .and_then(|a| a.attr("location"))
        .map(str::to_string);
    Ok(WsdlInfo {
        endpoint,
        namespace: doc.attr("targetNamespace").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:ns1="urn:packetfront_becs"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/">
  <SOAP-ENV:Body>{}</SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
            body
        )
    }

    #[test]
    fn envelope_carries_params_and_session_header() {
        let xml = envelope(
            "urn:packetfront_becs",
            "objectTreeFind",
            Some("sess-1"),
            &[("oid", "108871".into()), ("walkdown", "0".into())],
        );
        assert!(xml.contains(r#"xmlns:ns1="urn:packetfront_becs""#));
        assert!(xml.contains("<ns1:request><sessionid>sess-1</sessionid></ns1:request>"));
        assert!(xml.contains("<ns1:objectTreeFind><in><oid>108871</oid><walkdown>0</walkdown></in></ns1:objectTreeFind>"));
    }

    #[test]
    fn envelope_escapes_values_and_omits_header_without_session() {
        let xml = envelope(DEFAULT_NAMESPACE, "sessionLogin", None, &[("password", "a<b&c".into())]);
        assert!(!xml.contains("Header"));
        assert!(xml.contains("<password>a&lt;b&amp;c</password>"));
    }

    #[test]
    fn empty_params_write_empty_part() {
        let xml = envelope(DEFAULT_NAMESPACE, "sessionLogout", Some("s"), &[]);
        assert!(xml.contains("<ns1:sessionLogout><in/></ns1:sessionLogout>"));
    }

    #[test]
    fn single_output_part_is_unwrapped() {
        let xml = wrap(
            "<ns1:sessionLoginResponse><out><err>0</err><sessionid>abc-123</sessionid></out></ns1:sessionLoginResponse>",
        );
        let v = decode_response(&xml).unwrap();
        assert_eq!(v, json!({"err": 0, "sessionid": "abc-123"}));
    }

    #[test]
    fn document_order_and_repeated_siblings_are_kept() {
        let xml = wrap(
            r#"<ns1:objectTreeFindResponse><out>
                 <err>0</err>
                 <objects><oid>5</oid><name>zeta</name><class>element-attach</class></objects>
                 <objects><oid>6</oid><name>alpha</name><class>interface</class></objects>
                 <objects><oid>7</oid><name>beta</name><class>interface</class></objects>
               </out></ns1:objectTreeFindResponse>"#,
        );
        let v = decode_response(&xml).unwrap();
        let text = serde_json::to_string(&v).unwrap();
        assert_eq!(
            text,
            r#"{"err":0,"objects":[{"oid":5,"name":"zeta","class":"element-attach"},{"oid":6,"name":"alpha","class":"interface"},{"oid":7,"name":"beta","class":"interface"}]}"#
        );
    }

    #[test]
    fn soap_arrays_stay_arrays_with_one_item() {
        let xml = wrap(
            r#"<ns1:objectTreeFindResponse><out>
                 <objects SOAP-ENC:arrayType="ns1:object[1]" xsi:type="SOAP-ENC:Array">
                   <item><oid>5</oid></item>
                 </objects>
               </out></ns1:objectTreeFindResponse>"#,
        );
        let v = decode_response(&xml).unwrap();
        assert_eq!(v, json!({"objects": [{"oid": 5}]}));
    }

    #[test]
    fn scalars_follow_xsi_type_then_integer_shape() {
        let xml = wrap(
            r#"<ns1:r><out>
                 <name xsi:type="xsd:string">42</name>
                 <enabled xsi:type="xsd:boolean">true</enabled>
                 <ratio xsi:type="xsd:double">0.5</ratio>
                 <parentoid>1</parentoid>
                 <serial>0012</serial>
                 <flags/>
                 <gone xsi:nil="true"></gone>
               </out></ns1:r>"#,
        );
        let v = decode_response(&xml).unwrap();
        assert_eq!(
            v,
            json!({
                "name": "42",
                "enabled": true,
                "ratio": 0.5,
                "parentoid": 1,
                "serial": "0012",
                "flags": null,
                "gone": null
            })
        );
    }

    #[test]
    fn typed_strings_keep_their_exact_text() {
        let xml = wrap(
            r#"<ns1:r><out><descr xsi:type="xsd:string"></descr><pad xsi:type="xsd:string">  a  </pad><sp xsi:type="xsd:string">   </sp><empty xsi:type="xsd:string"/></out></ns1:r>"#,
        );
        let v = decode_response(&xml).unwrap();
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"descr":"","pad":"  a  ","sp":"   ","empty":""}"#
        );
    }

    #[test]
    fn untyped_text_is_not_trimmed() {
        let xml = wrap("<ns1:r><out><name> edge-1 </name><blank>\n  </blank></out></ns1:r>");
        let v = decode_response(&xml).unwrap();
        assert_eq!(v, json!({"name": " edge-1 ", "blank": null}));
    }

    #[test]
    fn fault_becomes_error() {
        let xml = wrap(
            "<SOAP-ENV:Fault><faultcode>SOAP-ENV:Client</faultcode><faultstring>Invalid session</faultstring></SOAP-ENV:Fault>",
        );
        match decode_response(&xml) {
            Err(SoapError::Fault { code, message }) => {
                assert_eq!(code, "SOAP-ENV:Client");
                assert_eq!(message, "Invalid session");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_zero_err_is_rejection() {
        let xml = wrap(
            "<ns1:sessionLoginResponse><out><err>3</err><errtxt>Bad password</errtxt></out></ns1:sessionLoginResponse>",
        );
        let err = decode_response(&xml).unwrap_err();
        assert_eq!(err.to_string(), "rejected (err 3): Bad password");
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode_response("not xml"), Err(SoapError::Malformed(_))));
        assert!(matches!(
            decode_response("<html><body>oops</body></html>"),
            Err(SoapError::Malformed(_))
        ));
    }

    #[test]
    fn wsdl_yields_address_and_namespace() {
        let wsdl = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    targetNamespace="urn:packetfront_becs">
  <service name="becs">
    <port name="becsPort" binding="tns:becsBinding">
      <soap:address location="https://becs.example.net:4490/"/>
    </port>
  </service>
</definitions>"#;
        let info = parse_wsdl(wsdl).unwrap();
        assert_eq!(info.endpoint.as_deref(), Some("https://becs.example.net:4490/"));
        assert_eq!(info.namespace.as_deref(), Some("urn:packetfront_becs"));
    }
}
