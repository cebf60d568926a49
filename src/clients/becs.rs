use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;

use crate::clients::soap::{decode_response, envelope, parse_wsdl, SoapError, DEFAULT_NAMESPACE};
use crate::core::api::ElementApi;
use crate::domain::{Credentials, QueryResult, Session, TreeFindRequest};
use crate::infra::http::headers::becs_request;
use crate::infra::runtime::limits::make_http_client;

/// BECS ExtAPI over SOAP 1.1.
#[derive(Clone)]
pub struct BecsClient {
    endpoint: String,
    namespace: String,
    http: Client,
}

impl BecsClient {
    /// Client for a known SOAP endpoint, skipping WSDL discovery.
    pub fn new(endpoint: impl Into<String>, namespace: impl Into<String>) -> Result<Self, SoapError> {
        let http = make_http_client().map_err(|e| SoapError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            namespace: namespace.into(),
            http,
        })
    }

    /// Fetch the WSDL at `wsdl_url` and bind to the service address it declares.
    pub async fn connect(wsdl_url: &str) -> Result<Self, SoapError> {
        let mut client = Self::new(wsdl_url, DEFAULT_NAMESPACE)?;
        let (builder, rid) = becs_request(client.http.get(wsdl_url), None);
        tracing::debug!(url = %wsdl_url, request_id = %rid, "fetching wsdl");
        let resp = builder
            .send()
            .await
            .map_err(|e| SoapError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SoapError::Status(resp.status().as_u16()));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| SoapError::Transport(e.to_string()))?;
        let info = parse_wsdl(&text)?;
        if let Some(endpoint) = info.endpoint {
            client.endpoint = endpoint;
        }
        if let Some(ns) = info.namespace {
            client.namespace = ns;
        }
        tracing::info!(endpoint = %client.endpoint, namespace = %client.namespace, "becs endpoint resolved");
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn call(
        &self,
        operation: &str,
        session: Option<&Session>,
        params: &[(&str, String)],
    ) -> Result<Value, SoapError> {
        let body = envelope(
            &self.namespace,
            operation,
            session.map(Session::id),
            params,
        );
        let (builder, rid) = becs_request(self.http.post(&self.endpoint), Some(operation));
        let start = Instant::now();
        let resp = builder
            .body(body)
            .send()
            .await
            .map_err(|e| SoapError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SoapError::Transport(e.to_string()))?;
        tracing::debug!(
            operation = operation,
            request_id = %rid,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "soap call"
        );
        // Faults normally arrive with a 500; prefer the fault text over the bare status.
        match decode_response(&text) {
            Ok(v) if status.is_success() => Ok(v),
            Ok(_) => Err(SoapError::Status(status.as_u16())),
            Err(SoapError::Malformed(_)) if !status.is_success() => {
                Err(SoapError::Status(status.as_u16()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ElementApi for BecsClient {
    async fn session_login(&self, credentials: &Credentials) -> Result<Session, SoapError> {
        let out = self
            .call(
                "sessionLogin",
                None,
                &[
                    ("username", credentials.username.clone()),
                    ("password", credentials.password.clone()),
                ],
            )
            .await?;
        match out.get("sessionid") {
            Some(Value::String(s)) if !s.is_empty() => Ok(Session::new(s.as_str())),
            Some(Value::Number(n)) => Ok(Session::new(n.to_string())),
            _ => Err(SoapError::Malformed("login response without sessionid".into())),
        }
    }

    async fn object_tree_find(
        &self,
        session: &Session,
        request: &TreeFindRequest,
    ) -> Result<QueryResult, SoapError> {
        let start = Instant::now();
        let res = self
            .call(
                "objectTreeFind",
                Some(session),
                &[
                    ("oid", request.oid.to_string()),
                    ("classmask", request.classmask.clone()),
                    ("walkdown", request.walkdown.to_string()),
                ],
            )
            .await;
        if res.is_err() {
            crate::infra::logging::log_metric("objectTreeFind", "remote_error_total", 1.0);
        }
        let tree = res?;
        let elapsed_ms = start.elapsed().as_millis() as f64;
        crate::infra::logging::log_metric("objectTreeFind", "remote_latency_ms", elapsed_ms);
        Ok(tree)
    }

    async fn session_logout(&self, session: &Session) -> Result<(), SoapError> {
        self.call("sessionLogout", Some(session), &[]).await?;
        Ok(())
    }
}
