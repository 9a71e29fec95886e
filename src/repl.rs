use crate::catalog::TransactionCatalog;
use crate::protocol::{Protocol, UnknownProtocol};
use crate::session::{CommitOutcome, SelectOutcome, Session, SessionError};
use anyhow::Result;
use log::debug;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "> ";

const HELP: &str = "\
commands:
  list               list the transaction catalog
  show <name>        show a transaction's operations
  select <name>      add a transaction (at most two)
  random             add a random transaction
  protocol <name>    Wait-Die or Wound-Wait
  commit             commit the selected transactions
  clear              clear every pane and the selection
  panes              print every pane
  help               this text
  quit               leave
";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    List,
    Show(String),
    Select(String),
    Random,
    Protocol(Protocol),
    Commit,
    Clear,
    Panes,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command {0:?}, try help")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Protocol(#[from] UnknownProtocol),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (word, rest) = match s.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (s, ""),
        };
        let argument = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };
        match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "show" => Ok(Command::Show(argument("show")?)),
            "select" | "add" => Ok(Command::Select(argument("select")?)),
            "random" => Ok(Command::Random),
            "protocol" => Ok(Command::Protocol(argument("protocol")?.parse::<Protocol>()?)),
            "commit" => Ok(Command::Commit),
            "clear" => Ok(Command::Clear),
            "panes" => Ok(Command::Panes),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

fn render_catalog(catalog: &TransactionCatalog) -> String {
    let mut out = String::new();
    for txn in catalog.iter() {
        let ops: Vec<String> = txn.operations.iter().map(|op| op.to_string()).collect();
        let _ = writeln!(out, "{}: {}", txn.name, ops.join(", "));
    }
    out
}

/// Applies one command and returns what should be printed.
pub fn execute(session: &mut Session, command: Command) -> Result<String, SessionError> {
    debug!("execute {:?}", command);
    let out = match command {
        Command::List => render_catalog(session.catalog()),
        Command::Show(name) => {
            session.show(&name)?;
            session.panes().message.to_string()
        }
        Command::Select(name) => match session.select(&name)? {
            SelectOutcome::Rejected => session.panes().message.to_string(),
            SelectOutcome::AlreadySelected => format!("{} is already selected\n", name),
            SelectOutcome::Added => session.panes().memory_log.to_string(),
        },
        Command::Random => {
            let mut rng = rand::thread_rng();
            match session.select_random(&mut rng)? {
                SelectOutcome::Rejected => session.panes().message.to_string(),
                _ => session.panes().memory_log.to_string(),
            }
        }
        Command::Protocol(protocol) => {
            session.set_protocol(protocol);
            format!("protocol: {}\n", protocol)
        }
        Command::Commit => match session.commit()? {
            CommitOutcome::Committed(_) => session.panes().disk_log.to_string(),
            CommitOutcome::Resolved(_) => format!(
                "{}{}",
                session.panes().message,
                session.panes().protocol_behavior
            ),
        },
        Command::Clear => {
            session.clear();
            "cleared\n".to_string()
        }
        Command::Panes => session.panes().to_string(),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(out)
}

/// Reads commands line by line until `quit` or end of input.
pub async fn run_repl<R, W>(session: &mut Session, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    writer.write_all(PROMPT.as_bytes()).await?;
    writer.flush().await?;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            writer.write_all(PROMPT.as_bytes()).await?;
            writer.flush().await?;
            continue;
        }
        let out = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => execute(session, command).unwrap_or_else(|e| format!("error: {}\n", e)),
            Err(e) => format!("error: {}\n", e),
        };
        writer.write_all(out.as_bytes()).await?;
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.flush().await?;
    Ok(())
}
