//! ZCP: the MCP control plane for Zerops.
//!
//! **ZCP lets an LLM agent operate a Zerops project end to end**:
//! discover services, import infrastructure from YAML, deploy code,
//! scale, read logs, manage environment variables, and walk guided
//! multi-step workflows with evidence gates.
//!
//! This is not a CLI for humans. Humans run `zcp init` once; agents do
//! everything else through MCP tool calls over stdio.
//!
//! # Design
//!
//! - **Knowledge-first**: an embedded markdown corpus (themes, recipes)
//!   answers platform questions before any YAML is generated. Tools
//!   point agents at it; the workflow engine checks they used it.
//! - **Evidence-gated**: multi-step operations run inside a workflow
//!   session whose phase transitions require recorded evidence. The
//!   bootstrap conductor walks eleven steps from `detect` to `report`.
//! - **Capability-aware**: SSHFS mounting and SSH deploys only exist
//!   inside Zerops containers; the tool surface shrinks to match where
//!   the process runs.
//!
//! # Crate structure
//!
//! - [`core`]: platform client, auth, workflow engine, bootstrap
//!   conductor, system capabilities
//! - [`knowledge`]: embedded corpus with lexical search and the
//!   briefing assembler
//! - [`tools`]: the MCP tool registry, one module per tool
//! - [`server`]: JSON-RPC 2.0 host over stdio
//! - [`init`]: project scaffolding for Claude Code integration
//!
//! # Usage
//!
//! ```bash
//! # Scaffold CLAUDE.md, .mcp.json, SSH config, aliases
//! zcp init
//!
//! # Serve MCP on stdio (what .mcp.json invokes)
//! ZCP_API_KEY=<token> zcp serve
//!
//! # Version and corpus size
//! zcp version
//! ```
//!
//! Logging goes to stderr and honors the `ZCP_LOG` env filter
//! (`ZCP_LOG=debug`, `ZCP_LOG=zcp::tools=trace`, ...); stdout carries
//! only protocol messages.

pub mod core;
pub mod init;
pub mod knowledge;
pub mod server;
pub mod tools;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::auth;
use crate::core::cache::StackTypeCache;
use crate::core::client::{Client, LocalDeployer, Mounter, SshDeployer};
use crate::core::engine::Engine;
use crate::core::error::ZcpError;
use crate::core::runtime;
use crate::core::system::{SystemLocalDeployer, SystemMounter, SystemSshDeployer};
use crate::core::zerops::{ZeropsClient, ZeropsLogFetcher};
use crate::tools::{Deps, KnowledgeTracker};

#[derive(Parser, Debug)]
#[clap(
    name = "zcp",
    version = env!("CARGO_PKG_VERSION"),
    about = "ZCP is the MCP control plane for Zerops: agents discover, import, deploy, and verify services through evidence-gated workflows.",
    disable_version_flag = true
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP over stdio (the default when no subcommand is given)
    Serve(ServeCli),
    /// Scaffold Claude Code + Zerops integration files
    Init,
    /// Print version and knowledge corpus size
    Version,
}

#[derive(clap::Args, Debug, Default)]
struct ServeCli {
    /// Run without the workflow engine; mutating tools lose their
    /// session gate
    #[clap(long)]
    no_workflow: bool,
}

pub fn run() -> Result<(), ZcpError> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init) => init::run(&std::env::current_dir()?),
        Some(Command::Version) => {
            print_version();
            Ok(())
        }
        Some(Command::Serve(opts)) => serve(opts),
        None => serve(ServeCli::default()),
    }
}

/// Logs to stderr; stdout belongs to the MCP transport.
fn init_logging() {
    let filter = EnvFilter::try_from_env("ZCP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_version() {
    let corpus = knowledge::store().map(|s| s.document_count()).unwrap_or(0);
    println!(
        "zcp {} ({} knowledge documents)",
        env!("CARGO_PKG_VERSION"),
        corpus
    );
}

fn serve(opts: ServeCli) -> Result<(), ZcpError> {
    let creds = auth::resolve_credentials()?;
    let client: Arc<dyn Client> = Arc::new(ZeropsClient::new(&creds.token, &creds.api_host)?);
    let auth_info = auth::resolve(client.as_ref(), &creds)?;
    info!(
        project = %auth_info.project_name,
        region = %auth_info.region,
        "authenticated"
    );

    let log_fetcher = Arc::new(ZeropsLogFetcher::new()?);
    let rt = runtime::detect();
    if rt.in_container {
        info!(service = %rt.service_name, "running inside a Zerops container");
    }

    let engine = if opts.no_workflow {
        None
    } else {
        Some(Engine::new(
            std::env::current_dir()?.join(".zcp").join("state"),
        ))
    };

    // SSHFS and container-to-container SSH only exist on the project
    // network; zcli push works from anywhere.
    let mounter: Option<Arc<dyn Mounter>> = rt
        .in_container
        .then(|| Arc::new(SystemMounter::new()) as Arc<dyn Mounter>);
    let ssh_deployer: Option<Arc<dyn SshDeployer>> = rt
        .in_container
        .then(|| Arc::new(SystemSshDeployer::new()) as Arc<dyn SshDeployer>);
    let local_deployer: Option<Arc<dyn LocalDeployer>> =
        Some(Arc::new(SystemLocalDeployer::new()));

    let deps = Deps {
        client,
        log_fetcher,
        auth: auth_info,
        runtime: rt,
        cache: StackTypeCache::default(),
        engine,
        tracker: KnowledgeTracker::new(),
        local_deployer,
        ssh_deployer,
        mounter,
    };

    server::Server::new(deps).run()
}
