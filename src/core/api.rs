use async_trait::async_trait;

use crate::clients::soap::SoapError;
use crate::domain::{Credentials, QueryResult, Session, TreeFindRequest};

/// The three logical operations of the BECS ExtAPI used by the query tool.
///
/// Transport details (SOAP envelopes, headers) stay behind this trait so the
/// orchestration can be driven by any implementation, including in-memory fakes.
#[async_trait]
pub trait ElementApi: Send + Sync {
    async fn session_login(&self, credentials: &Credentials) -> Result<Session, SoapError>;

    async fn object_tree_find(
        &self,
        session: &Session,
        request: &TreeFindRequest,
    ) -> Result<QueryResult, SoapError>;

    async fn session_logout(&self, session: &Session) -> Result<(), SoapError>;
}
