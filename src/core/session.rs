use crate::core::api::ElementApi;
use crate::core::error::ToolError;
use crate::domain::{Credentials, QueryResult, Session, TreeFindRequest};

/// A logged-in view of an [`ElementApi`].
///
/// The session is attached to every call made through this handle. `logout`
/// consumes the handle, so a session can be closed at most once.
pub struct AuthenticatedClient<'a, A: ElementApi + ?Sized> {
    api: &'a A,
    session: Session,
}

impl<'a, A: ElementApi + ?Sized> AuthenticatedClient<'a, A> {
    pub async fn login(api: &'a A, credentials: &Credentials) -> Result<Self, ToolError> {
        let session = api
            .session_login(credentials)
            .await
            .map_err(|e| ToolError::Authentication(e.to_string()))?;
        tracing::debug!(username = %credentials.username, "session opened");
        Ok(Self { api, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn query_tree(&self, request: &TreeFindRequest) -> Result<QueryResult, ToolError> {
        self.api
            .object_tree_find(&self.session, request)
            .await
            .map_err(|e| ToolError::Query(e.to_string()))
    }

    pub async fn logout(self) -> Result<(), ToolError> {
        self.api
            .session_logout(&self.session)
            .await
            .map_err(|e| ToolError::Logout(e.to_string()))?;
        tracing::debug!("session closed");
        Ok(())
    }
}
