use clap::Parser;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "gossip-chain", about = "Run one peer of the loopback gossip chain")]
pub struct Opt {
    #[arg(long, help = "TOML file with node settings")]
    pub config: Option<PathBuf>,
    #[arg(long = "port-start", help = "First port of the discovery range")]
    pub port_start: Option<u16>,
    #[arg(long = "port-end", help = "Last port of the discovery range")]
    pub port_end: Option<u16>,
    #[arg(
        long = "log-level",
        help = "Log filter (off, error, warn, info, debug, trace); RUST_LOG also works"
    )]
    pub log_level: Option<LevelFilter>,
}

/// One line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Peers,
    Chain,
    Add(String),
    Edit(u64, String),
    Status,
    Exit,
}

pub const MENU: &str = "\
1 | peers          Print peers
2 | chain          Print chain
3 | add <data>     Add data to the chain
    edit <i> <data> Rewrite block i and repair the chain
    status         Show node status
0 | exit           Exit";

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_lowercase().as_str() {
            "1" | "peers" => Ok(Command::Peers),
            "2" | "chain" => Ok(Command::Chain),
            "3" | "add" => {
                if rest.is_empty() {
                    Err("Usage: 3 <data>".to_string())
                } else {
                    Ok(Command::Add(rest.to_string()))
                }
            }
            "edit" => {
                let (idx, data) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "Usage: edit <index> <data>".to_string())?;
                let idx = idx
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid block index: {idx}"))?;
                Ok(Command::Edit(idx, data.trim().to_string()))
            }
            "status" => Ok(Command::Status),
            "0" | "exit" | "quit" => Ok(Command::Exit),
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command: {other}")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Peers => write!(f, "peers"),
            Command::Chain => write!(f, "chain"),
            Command::Add(data) => write!(f, "add {data}"),
            Command::Edit(idx, data) => write!(f, "edit {idx} {data}"),
            Command::Status => write!(f, "status"),
            Command::Exit => write!(f, "exit"),
        }
    }
}
