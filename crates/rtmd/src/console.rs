//! Operator console
//!
//! Reads CUD commands from stdin and applies them to the sync server. A
//! malformed command is reported and mutates nothing; the resulting table
//! is printed after every committed operation, as the operator's feedback.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use rtm_types::{parse_address, RouteEntry, MAX_PREFIX_LEN};

use crate::sync::SyncServer;

const CREATE_USAGE: &str = "create <destination> <mask 0-32> <gateway> <interface>";
const UPDATE_USAGE: &str = "update <destination> <mask 0-32> <gateway> <interface>";
const DELETE_USAGE: &str = "delete <destination> <mask 0-32>";

/// Console help text, shown on request.
pub const HELP_TEXT: &str = "\
Available commands:
  help                                                  show this help
  show                                                  print the routing table
  create <destination> <mask 0-32> <gateway> <interface>
  update <destination> <mask 0-32> <gateway> <interface>
  delete <destination> <mask 0-32>";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the help text.
    Help,
    /// Print the current table.
    Show,
    /// Insert or overwrite a route.
    Create(RouteEntry),
    /// Replace an existing route.
    Update(RouteEntry),
    /// Remove a route by destination.
    Delete {
        /// Destination address to remove.
        destination: u32,
        /// Mask as typed; carried for the delete delta, ignored as key.
        mask: u8,
    },
}

/// Reasons an operator line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Nothing but whitespace.
    #[error("empty command")]
    Empty,

    /// First word is not a known command.
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    /// Wrong argument shape for a known command.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// An address argument did not parse as dotted-quad IPv4.
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    /// A mask argument was not an integer in 0-32.
    #[error("invalid mask '{0}', expected 0-32")]
    InvalidMask(String),
}

/// Parse one console line into a command.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, rest)) = args.split_first() else {
        return Err(CommandError::Empty);
    };

    match name {
        "help" => Ok(Command::Help),
        "show" => Ok(Command::Show),
        "create" => parse_route_args(rest, CREATE_USAGE).map(Command::Create),
        "update" => parse_route_args(rest, UPDATE_USAGE).map(Command::Update),
        "delete" => {
            let [destination, mask] = rest else {
                return Err(CommandError::Usage(DELETE_USAGE));
            };
            Ok(Command::Delete {
                destination: parse_addr_arg(destination)?,
                mask: parse_mask_arg(mask)?,
            })
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_route_args(args: &[&str], usage: &'static str) -> Result<RouteEntry, CommandError> {
    let [destination, mask, gateway, interface] = args else {
        return Err(CommandError::Usage(usage));
    };
    Ok(RouteEntry {
        destination: parse_addr_arg(destination)?,
        mask: parse_mask_arg(mask)?,
        gateway: parse_addr_arg(gateway)?,
        interface: (*interface).to_string(),
    })
}

fn parse_addr_arg(arg: &str) -> Result<u32, CommandError> {
    parse_address(arg).ok_or_else(|| CommandError::InvalidAddress(arg.to_string()))
}

fn parse_mask_arg(arg: &str) -> Result<u8, CommandError> {
    arg.parse::<u8>()
        .ok()
        .filter(|mask| *mask <= MAX_PREFIX_LEN)
        .ok_or_else(|| CommandError::InvalidMask(arg.to_string()))
}

/// Run the operator console until stdin closes or shutdown is signalled.
pub async fn run(server: SyncServer, mut shutdown: watch::Receiver<bool>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("rtmd console ready, type 'help' for commands");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&server, &line),
                Ok(None) => {
                    debug!("stdin closed, console exiting");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "console read failed");
                    break;
                }
            }
        }
    }
}

fn handle_line(server: &SyncServer, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match parse_command(line) {
        Ok(Command::Help) => println!("{HELP_TEXT}"),
        Ok(Command::Show) => print!("{}", server.render_table()),
        Ok(Command::Create(entry)) => {
            server.create(entry);
            print!("{}", server.render_table());
        }
        Ok(Command::Update(entry)) => match server.update(entry) {
            Ok(_) => print!("{}", server.render_table()),
            Err(e) => println!("update rejected: {e}"),
        },
        Ok(Command::Delete { destination, mask }) => {
            server.delete(destination, mask);
            print!("{}", server.render_table());
        }
        Err(e) => println!("{e}"),
    }
}
