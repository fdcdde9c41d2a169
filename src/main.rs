//! Clarity CLI
//!
//! Runs the AI proxy server and works with the local journal.

use clap::{Parser, Subcommand};
use clarity::ai::AiProxy;
use clarity::config::{resolve_home, ClarityConfig};
use clarity::export::{export_file_name, ExportFormat};
use clarity::lifecycle::{self, SynthesisOutcome};
use clarity::{
    views, HttpAiProxy, JsonFilePersister, ProxyService, Store, ThinkingLens, ToolkitType,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Clarity - guided thinking toolkits with AI synthesis
#[derive(Parser, Debug)]
#[command(name = "clarity")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Clarity home (defaults to $CLARITY_HOME or ~/.clarity)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the AI proxy HTTP server
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
    },
    /// List workspaces
    Workspaces,
    /// Create a workspace
    NewWorkspace {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Start a toolkit session
    Start {
        toolkit: ToolkitType,
        /// Workspace to start in (defaults to the active one)
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Write the content of one step (1-based)
    Write {
        session: String,
        step: usize,
        content: String,
    },
    /// Synthesize a session
    Synthesize {
        session: String,
        /// Lens to synthesize through
        #[arg(long)]
        lens: Option<ThinkingLens>,
        /// Leave sibling sessions out of the prompt
        #[arg(long)]
        no_context: bool,
        /// Use a running Clarity server instead of calling the model directly
        #[arg(long)]
        server: Option<String>,
    },
    /// Most recently updated sessions
    Recent {
        #[arg(short, default_value_t = 5)]
        n: usize,
    },
    /// Search sessions
    Search { query: String },
    /// Workspace statistics and clarity score
    Stats { workspace: String },
    /// Export a session
    Export {
        session: String,
        #[arg(long, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
        /// Output file (defaults to stdout)
        #[arg(short)]
        o: Option<PathBuf>,
    },
    /// List the toolkit catalogue
    Toolkits,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let home = resolve_home(cli.home)?;
    let config = ClarityConfig::load(home).await?;

    match cli.command {
        Command::Serve { bind } => {
            let config = match bind {
                Some(bind) => config.with_bind(bind),
                None => config,
            };
            clarity::server::serve(&config).await?;
        }
        Command::Toolkits => {
            for toolkit in ToolkitType::ALL {
                println!(
                    "{:<18} {:<22} {:<12} {}",
                    toolkit.as_str(),
                    toolkit.display_name(),
                    toolkit.category(),
                    toolkit.description()
                );
            }
        }
        command => run_store_command(command, &config).await?,
    }
    Ok(())
}

async fn run_store_command(command: Command, config: &ClarityConfig) -> anyhow::Result<()> {
    let mut store = Store::load(JsonFilePersister::in_dir(&config.data_dir)).await;

    match command {
        Command::Workspaces => {
            let active = store.state().active_workspace_id.clone();
            for workspace in store.workspaces() {
                let sessions = views::workspace_sessions(store.sessions(), &workspace.id);
                let marker = if active.as_deref() == Some(workspace.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  ({} sessions, clarity {})",
                    marker,
                    workspace.id,
                    workspace.title,
                    sessions.len(),
                    views::clarity_score(sessions)
                );
            }
        }
        Command::NewWorkspace { title, description } => {
            let workspace = store.create_workspace(title, description).await;
            store.set_active_workspace(Some(workspace.id.clone())).await;
            println!("{}", workspace.id);
        }
        Command::Start { toolkit, workspace } => {
            if let Some(id) = workspace {
                if store.workspace(&id).is_none() {
                    anyhow::bail!("no workspace {}", id);
                }
                store.set_active_workspace(Some(id)).await;
            }
            let session = lifecycle::start_toolkit(&mut store, toolkit).await;
            println!("{}", session.id);
            for (i, template) in toolkit.steps().iter().enumerate() {
                println!("  {}. {}: {}", i + 1, template.label, template.prompt);
            }
        }
        Command::Write {
            session,
            step,
            content,
        } => {
            let index = step.checked_sub(1).unwrap_or(usize::MAX);
            if !store.update_step(&session, index, content).await {
                anyhow::bail!("no step {} in session {}", step, session);
            }
        }
        Command::Synthesize {
            session,
            lens,
            no_context,
            server,
        } => {
            if let Some(lens) = lens {
                if !store.set_lens(&session, lens).await {
                    anyhow::bail!("no session {}", session);
                }
            }
            let proxy: Box<dyn AiProxy> = match server {
                Some(url) => Box::new(HttpAiProxy::new(url)),
                None => Box::new(ProxyService::from_config(config)),
            };
            let outcome =
                lifecycle::synthesize(&mut store, proxy.as_ref(), &session, !no_context).await;
            match outcome {
                SynthesisOutcome::Generated(outputs) | SynthesisOutcome::Guidance(outputs) => {
                    for insight in &outputs.insights {
                        println!("- {}", insight);
                    }
                    if outputs.has_truth() {
                        println!("\n> {}\n", outputs.sentence_of_truth);
                    }
                    for (i, step) in outputs.necessary_moves.iter().enumerate() {
                        println!("{}. {}", i + 1, step);
                    }
                }
                SynthesisOutcome::Failed(reason) => anyhow::bail!("synthesis failed: {}", reason),
            }
        }
        Command::Recent { n } => {
            for session in views::recent_sessions(store.sessions(), n) {
                println!(
                    "{}  {}  {}",
                    session.id,
                    session.updated_at.format("%Y-%m-%d %H:%M"),
                    session.toolkit_type.display_name()
                );
            }
        }
        Command::Search { query } => {
            for session in views::search_recent(store.sessions(), store.workspaces(), &query) {
                let title = store
                    .workspace(&session.workspace_id)
                    .map(|w| w.title.as_str())
                    .unwrap_or("-");
                println!(
                    "{}  {}  {}",
                    session.id,
                    session.toolkit_type.display_name(),
                    title
                );
            }
        }
        Command::Stats { workspace } => {
            if store.workspace(&workspace).is_none() {
                anyhow::bail!("no workspace {}", workspace);
            }
            let stats = views::workspace_stats(store.sessions(), &workspace);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export { session, format, o } => {
            let Some((found, workspace)) = views::resolve_session(store.state(), &session) else {
                anyhow::bail!("no session {}", session);
            };
            let document = format.render(found, workspace, chrono::Utc::now());
            match o {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export_file_name(found, format.extension()))
                    } else {
                        path
                    };
                    tokio::fs::write(&path, document).await?;
                    info!("Exported {} to {}", session, path.display());
                }
                None => print!("{}", document),
            }
        }
        Command::Serve { .. } | Command::Toolkits => {}
    }
    Ok(())
}
