use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kura_core::session::SessionConfig;
use kura_core::{AggregationMode, ExplorerSession, KuraConfig};
use tracing_subscriber::{fmt, EnvFilter};

use kura_explorer::protocol::ExplorerRequest;
use kura_explorer::{load_checkpoint, render, router};

#[derive(Parser, Debug)]
#[command(author, version, about = "Explore the cluster hierarchy of a Kura checkpoint", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "kura.toml")]
    config: String,

    /// Checkpoint directory (overrides `checkpoint.dir`)
    #[arg(short, long, env = "KURA_CHECKPOINT_DIR")]
    dir: Option<PathBuf>,

    /// Print the JSON response envelope instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which checkpoint files loaded
    Status,
    /// Print the cluster hierarchy
    Tree,
    /// List the clusters at one level (top-level clusters are level 1)
    Level { level: usize },
    /// Show a cluster with its metadata summary
    Cluster {
        id: String,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// List the conversations of a cluster with their summaries
    Conversations { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Individual,
    List,
}

impl From<Mode> for AggregationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Individual => AggregationMode::Individual,
            Mode::List => AggregationMode::List,
        }
    }
}

impl From<Command> for ExplorerRequest {
    fn from(command: Command) -> Self {
        match command {
            Command::Status => ExplorerRequest::Status,
            Command::Tree => ExplorerRequest::Tree,
            Command::Level { level } => ExplorerRequest::Level { level },
            Command::Cluster { id, mode } => ExplorerRequest::Cluster {
                id,
                mode: mode.map(Into::into),
            },
            Command::Conversations { id } => ExplorerRequest::Conversations { id },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match KuraConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging (stderr; stdout carries the output)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.display.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let dir = args
        .dir
        .unwrap_or_else(|| PathBuf::from(&config.checkpoint.dir));

    let mut session = ExplorerSession::new(SessionConfig::from(&config));
    session.on_select(|node| tracing::debug!("Selected cluster {} at level {}", node.id, node.level));

    for (path, e) in load_checkpoint(&mut session, &dir).await {
        eprintln!("kura-explorer: {}: {}", path.display(), e);
    }

    let request = ExplorerRequest::from(args.command);

    if args.json {
        let response = router::handle_request(request, &mut session);
        println!("{}", serde_json::to_string_pretty(&response)?);
        if !response.is_ok() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match router::dispatch(request, &mut session) {
        Ok(reply) => print!("{}", render::render_reply(&reply, &config.display)),
        Err(e) => {
            eprintln!("kura-explorer: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
