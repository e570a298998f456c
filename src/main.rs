// This is the entry point of one peer: I start the node, then read commands
// from stdin until the user exits or closes the input
use clap::Parser;
use gossip_chain::{
    BlockchainError, Command, Config, Opt, PeerNode, Result, WorkerState, GLOBAL_CONFIG, MENU,
};
use log::{error, info, warn, LevelFilter};
use std::io::{self, BufRead};
use std::process;
use std::sync::Arc;

fn main() {
    let opt = Opt::parse();

    // Info by default, RUST_LOG on top of that, and --log-level wins over both
    let mut logger = env_logger::Builder::new();
    logger.filter_level(LevelFilter::Info);
    logger.parse_default_env();
    if let Some(level) = opt.log_level {
        logger.filter_level(level);
    }
    logger.init();

    if let Err(e) = run(&opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

// Defaults and CHAIN_* variables come from GLOBAL_CONFIG, then the TOML file,
// then the flags
fn build_config(opt: &Opt) -> Result<Config> {
    let mut config = GLOBAL_CONFIG.clone();
    if let Some(path) = &opt.config {
        config = config.with_file(path)?;
    }
    if let Some(port) = opt.port_start {
        config.port_start = port;
    }
    if let Some(port) = opt.port_end {
        config.port_end = port;
    }
    Ok(config)
}

fn run(opt: &Opt) -> Result<()> {
    let config = build_config(opt)?;
    let node = Arc::new(PeerNode::start(config)?);

    // Ctrl-C still tells the peers we are leaving before the process dies
    let handler_node = Arc::clone(&node);
    if let Err(e) = ctrlc::set_handler(move || {
        if let Err(e) = handler_node.shutdown() {
            error!("Shutdown failed: {e}");
        }
        process::exit(0);
    }) {
        warn!("Could not install the Ctrl-C handler: {e}");
    }

    println!("{MENU}");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| BlockchainError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Exit) => break,
            Ok(command) => {
                if let Err(e) = run_command(&node, command) {
                    error!("Error: {e}");
                }
            }
            Err(msg) => println!("{msg}\n{MENU}"),
        }

        if let WorkerState::Failed(reason) = node.listener_state()? {
            eprintln!("Warning: this node no longer receives messages ({reason})");
        }
    }

    info!("Exiting");
    node.shutdown()
}

fn run_command(node: &PeerNode, command: Command) -> Result<()> {
    match command {
        Command::Peers => {
            let peers = node.peers()?;
            println!("Peers ({}):", peers.len());
            for port in peers {
                println!("  {port}");
            }
        }
        Command::Chain => print!("{}", node.chain()?),
        Command::Add(data) => {
            let idx = node.add_data(data.as_bytes())?;
            println!("Added block {idx}");
        }
        Command::Edit(idx, data) => {
            node.update_data(idx, data.as_bytes())?;
            println!("Rewrote block {idx} and repaired the chain");
        }
        Command::Status => println!("{}", node.status()?),
        Command::Exit => {}
    }
    Ok(())
}
