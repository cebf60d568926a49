use clap::Parser;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::clients::becs::BecsClient;
use crate::core::api::ElementApi;
use crate::core::error::ToolError;
use crate::domain::{Oid, TreeFindRequest, DEFAULT_CLASSMASK, DEFAULT_OID};
use crate::infra::config::{BecsConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "becs-tree-query")]
#[command(about = "Print a BECS object subtree (element-attach, interface, resource-inet) as JSON")]
#[command(version)]
pub struct Cli {
    /// Configuration file holding the becs.eapi section
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Object classes to include
    #[arg(long, default_value = DEFAULT_CLASSMASK)]
    pub classmask: String,

    /// Levels to walk down below the start object
    #[arg(long, default_value_t = 0)]
    pub walkdown: u32,

    /// Object identifier to start from (default 1)
    #[arg(allow_negative_numbers = true)]
    pub oid: Vec<String>,
}

impl Cli {
    pub fn tree_find_request(&self) -> Result<TreeFindRequest, ToolError> {
        Ok(TreeFindRequest {
            oid: parse_arguments(&self.oid)?,
            classmask: self.classmask.clone(),
            walkdown: self.walkdown,
        })
    }
}

/// Zero arguments select the tree root; one must be an integer; more is a usage error.
pub fn parse_arguments<S: AsRef<str>>(args: &[S]) -> Result<Oid, ToolError> {
    match args {
        [] => Ok(DEFAULT_OID),
        [one] => {
            let raw = one.as_ref();
            raw.trim()
                .parse::<Oid>()
                .map_err(|_| ToolError::Argument(format!("'{}' is not an integer object id", raw)))
        }
        many => Err(ToolError::Usage(format!(
            "expected at most one object id, got {}",
            many.len()
        ))),
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with(cli, connect_becs, &mut out).await
}

pub async fn run_with<A, F, Fut, W>(cli: Cli, connect: F, out: &mut W) -> ExitCode
where
    A: ElementApi,
    F: FnOnce(BecsConfig) -> Fut,
    Fut: Future<Output = Result<A, ToolError>>,
    W: Write,
{
    let res = match cli.tree_find_request() {
        Ok(request) => crate::tool::execute(&cli.config, &request, connect, out).await,
        Err(e) => Err(e),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "becs query failed");
            eprintln!("❌ {}", e);
            ExitCode::from(&e)
        }
    }
}

async fn connect_becs(cfg: BecsConfig) -> Result<BecsClient, ToolError> {
    BecsClient::connect(&cfg.url)
        .await
        .map_err(|e| ToolError::Authentication(format!("cannot reach {}: {}", cfg.url, e)))
}
