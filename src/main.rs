use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use r_dlp::config::SimulatorConfig;
use r_dlp::conflict::ConflictRule;
use r_dlp::protocol::Protocol;
use r_dlp::repl::run_repl;
use r_dlp::session::{SelectOutcome, Session};
use std::path::PathBuf;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(
    name = "r_dlp",
    version,
    about = "Wait-Die and Wound-Wait deadlock prevention simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, short, default_value = "Wait-Die", help = "Wait-Die or Wound-Wait")]
    protocol: Protocol,

    #[arg(
        long,
        default_value = "access-mode",
        help = "access-mode (read/read never conflicts) or shared-variable"
    )]
    conflict_rule: ConflictRule,

    #[arg(long, help = "YAML file replacing the built-in transactions")]
    catalog: Option<PathBuf>,

    #[arg(long, short, default_value = "warn", help = "off, error, warn, info, debug or trace")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Select the given transactions, commit once and print every pane
    Run {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Read commands from stdin (default)
    Repl,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    let mut config = SimulatorConfig::new(cli.protocol, cli.conflict_rule);
    if let Some(path) = cli.catalog.as_ref() {
        config = config
            .with_catalog_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?;
    }
    info!(
        "protocol {}, conflict rule {}, {} transactions",
        config.protocol,
        config.conflict_rule,
        config.catalog.len()
    );
    let mut session = Session::new(config);

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Run { names } => {
            for name in names.iter() {
                if session.select(name)? == SelectOutcome::Rejected {
                    eprint!("{}: {}", name, session.panes().message);
                }
            }
            session.commit()?;
            print!("{}", session.panes());
        }
        Commands::Repl => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_repl(&mut session, stdin, tokio::io::stdout()).await?;
        }
    }
    Ok(())
}
