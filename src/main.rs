use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    becs_tree_query::infra::logging::init();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "BOOT becs-tree-query");
    becs_tree_query::cli::run().await
}
