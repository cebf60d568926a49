//! One authenticated tree query: config, login, query, print, logout.

use std::future::Future;
use std::io::Write;
use std::path::Path;

use crate::core::api::ElementApi;
use crate::core::error::ToolError;
use crate::core::session::AuthenticatedClient;
use crate::domain::{Credentials, QueryResult, TreeFindRequest};
use crate::infra::config::BecsConfig;

/// Load the config, build a client with `connect` and run the query.
///
/// Nothing touches the network before the config has been validated.
pub async fn execute<A, F, Fut, W>(
    config_path: &Path,
    request: &TreeFindRequest,
    connect: F,
    out: &mut W,
) -> Result<(), ToolError>
where
    A: ElementApi,
    F: FnOnce(BecsConfig) -> Fut,
    Fut: Future<Output = Result<A, ToolError>>,
    W: Write,
{
    let cfg = BecsConfig::load(config_path)?;
    let credentials = cfg.credentials();
    let api = connect(cfg).await?;
    run(&api, &credentials, request, out).await
}

/// Login, query and print. Once a session exists it is logged out exactly
/// once, whether the query succeeded or not. Logout failures are only logged.
pub async fn run<A, W>(
    api: &A,
    credentials: &Credentials,
    request: &TreeFindRequest,
    out: &mut W,
) -> Result<(), ToolError>
where
    A: ElementApi + ?Sized,
    W: Write,
{
    let client = AuthenticatedClient::login(api, credentials).await?;

    let outcome = match client.query_tree(request).await {
        Ok(tree) => emit(&tree, out),
        Err(e) => Err(e),
    };

    if let Err(e) = client.logout().await {
        tracing::warn!(error = %e, "ignoring logout failure");
    }
    outcome
}

/// Write the result as compact JSON, keys in the order the service sent them.
/// The text is fully rendered before anything is written.
pub fn emit<W: Write>(result: &QueryResult, out: &mut W) -> Result<(), ToolError> {
    let text = serde_json::to_string(result).map_err(std::io::Error::from)?;
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
