use crate::config::Config;
use crate::core::{Block, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::network::message::Message;
use crate::network::peers::PeerSet;
use crate::network::transport::{Outbound, PollSource, Transport};
use crate::network::{listener, synchronizer};
use crate::utils::{lock, CancellationToken};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Health of a background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Failed(String),
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Running => write!(f, "running"),
            WorkerState::Failed(reason) => write!(f, "failed ({reason})"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State shared by the control thread and both workers.
pub(crate) struct NodeContext {
    pub config: Config,
    pub chain: Mutex<Blockchain>,
    pub peers: PeerSet,
    pub outbound: Outbound,
    pub cancel: CancellationToken,
    listener_state: Mutex<WorkerState>,
}

impl NodeContext {
    /// Send `message` to every known peer.
    pub fn broadcast_to_peers(&self, message: Message) -> Result<usize> {
        let peers = self.peers.get_peers()?;
        if peers.is_empty() {
            return Ok(0);
        }
        self.outbound.broadcast(message, peers)
    }

    pub fn set_listener_state(&self, state: WorkerState) {
        match self.listener_state.lock() {
            Ok(mut guard) => *guard = state,
            Err(_) => error!("Listener state lock poisoned"),
        }
    }

    fn listener_state(&self) -> Result<WorkerState> {
        Ok(lock(&self.listener_state, "listener state")?.clone())
    }

    /// Announce ourselves to every port of the range but our own.
    fn send_connect_messages(&self) -> Result<usize> {
        let own = [self.outbound.sender_port(), self.outbound.receive_port()];
        let targets = self.config.ports().filter(|p| !own.contains(p));
        let sent = self.outbound.broadcast(Message::Connect, targets)?;
        debug!("Sent Connect to {sent} port(s)");
        Ok(sent)
    }
}

/// Snapshot reported by [`PeerNode::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub sender_port: u16,
    pub receive_port: u16,
    pub peer_count: usize,
    pub chain_length: u64,
    /// First block whose linkage or proof-of-work is broken.
    pub first_invalid_block: Option<u64>,
    pub listener: WorkerState,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Send port    : {}", self.sender_port)?;
        writeln!(f, "Receive port : {}", self.receive_port)?;
        writeln!(f, "Peers        : {}", self.peer_count)?;
        writeln!(f, "Chain length : {}", self.chain_length)?;
        match self.first_invalid_block {
            Some(idx) => writeln!(f, "Chain check  : broken at block {idx}")?,
            None => writeln!(f, "Chain check  : ok")?,
        }
        write!(f, "Listener     : {}", self.listener)
    }
}

/// A running peer: one chain, one peer set, a listener and a synchronizer.
///
/// Dropping the node shuts it down.
pub struct PeerNode {
    ctx: Arc<NodeContext>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl PeerNode {
    /// Bind both ports, announce the node to the range and start the workers.
    pub fn start(config: Config) -> Result<PeerNode> {
        config.validate()?;
        let Transport { outbound, inbound } = Transport::bind(&config)?;
        Self::launch(config, outbound, inbound)
    }

    /// Announce the node and spawn both workers, the listener reading `source`.
    fn launch<S>(config: Config, outbound: Outbound, source: S) -> Result<PeerNode>
    where
        S: PollSource + Send + 'static,
    {
        info!("Send port : {}", outbound.sender_port());
        info!("Receive port : {}", outbound.receive_port());

        let ctx = Arc::new(NodeContext {
            config,
            chain: Mutex::new(Blockchain::new()),
            peers: PeerSet::new(),
            outbound,
            cancel: CancellationToken::new(),
            listener_state: Mutex::new(WorkerState::Running),
        });
        ctx.send_connect_messages()?;

        let (vote_tx, vote_rx) = mpsc::channel();
        let mut workers = Vec::with_capacity(2);

        let listener_ctx = Arc::clone(&ctx);
        workers.push(
            thread::Builder::new()
                .name("listener".to_string())
                .spawn(move || listener::run(listener_ctx, source, vote_tx))
                .map_err(|e| {
                    BlockchainError::Network(format!("Failed to spawn listener: {e}"))
                })?,
        );

        let sync_ctx = Arc::clone(&ctx);
        let spawned = thread::Builder::new()
            .name("synchronizer".to_string())
            .spawn(move || synchronizer::run(sync_ctx, vote_rx));
        let node = PeerNode {
            ctx,
            workers: Mutex::new(workers),
            stopped: AtomicBool::new(false),
        };
        match spawned {
            Ok(handle) => {
                lock(&node.workers, "workers")?.push(handle);
            }
            Err(e) => {
                // Dropping the node stops the listener.
                return Err(BlockchainError::Network(format!(
                    "Failed to spawn synchronizer: {e}"
                )));
            }
        }
        Ok(node)
    }

    pub fn sender_port(&self) -> u16 {
        self.ctx.outbound.sender_port()
    }

    pub fn receive_port(&self) -> u16 {
        self.ctx.outbound.receive_port()
    }

    /// Known peer receive ports, ascending.
    pub fn peers(&self) -> Result<Vec<u16>> {
        self.ctx.peers.get_peers()
    }

    /// Copy of the current chain.
    pub fn chain(&self) -> Result<Blockchain> {
        Ok(lock(&self.ctx.chain, "chain")?.clone())
    }

    pub fn chain_length(&self) -> Result<u64> {
        Ok(lock(&self.ctx.chain, "chain")?.length())
    }

    /// Mine a block holding `data` and append it; returns its index.
    ///
    /// Mining runs outside the chain lock. If the chain grows meanwhile (a
    /// block arrived from a peer) the block is rebuilt on the new tail.
    pub fn add_data(&self, data: &[u8]) -> Result<u64> {
        loop {
            if self.ctx.cancel.is_cancelled() {
                return Err(BlockchainError::Shutdown);
            }
            let (idx, prev_hash) = {
                let chain = lock(&self.ctx.chain, "chain")?;
                (chain.length(), *chain.tail_hash())
            };

            let mut block = Block::new_unmined(idx, prev_hash, data)?;
            if !block.mine_cancellable(true, &self.ctx.cancel) {
                return Err(BlockchainError::Shutdown);
            }

            let mut chain = lock(&self.ctx.chain, "chain")?;
            if chain.length() == idx && *chain.tail_hash() == prev_hash {
                info!("Added block {idx} with hash {}", block.get_curr_hash());
                chain.push_block(block)?;
                return Ok(idx);
            }
            debug!("Chain moved while mining block {idx}; mining again");
        }
    }

    /// Rewrite the payload of block `idx` locally and repair the chain after it.
    ///
    /// The edit and the re-mining cascade run on a copy; the copy replaces the
    /// chain only if nothing changed it meanwhile, otherwise the edit is redone.
    pub fn update_data(&self, idx: u64, data: &[u8]) -> Result<()> {
        loop {
            if self.ctx.cancel.is_cancelled() {
                return Err(BlockchainError::Shutdown);
            }
            let base = self.chain()?;
            let mut edited = base.clone();
            edited.update_data(idx, data)?;

            let mut chain = lock(&self.ctx.chain, "chain")?;
            if *chain == base {
                *chain = edited;
                info!("Rewrote block {idx}");
                return Ok(());
            }
            debug!("Chain moved while rewriting block {idx}; editing again");
        }
    }

    /// Health of the listener worker.
    pub fn listener_state(&self) -> Result<WorkerState> {
        self.ctx.listener_state()
    }

    pub fn status(&self) -> Result<NodeStatus> {
        let (chain_length, first_invalid_block) = {
            let chain = lock(&self.ctx.chain, "chain")?;
            (chain.length(), chain.verify())
        };
        Ok(NodeStatus {
            sender_port: self.sender_port(),
            receive_port: self.receive_port(),
            peer_count: self.ctx.peers.len()?,
            chain_length,
            first_invalid_block,
            listener: self.ctx.listener_state()?,
        })
    }

    /// Tell every known peer we are leaving. Best effort: nothing is awaited.
    pub fn disconnect(&self) -> Result<usize> {
        let sent = self.ctx.broadcast_to_peers(Message::Disconnect)?;
        info!("Sent Disconnect to {sent} peer(s)");
        Ok(sent)
    }

    /// Disconnect, stop both workers and wait for them. Safe to call twice.
    pub fn shutdown(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.disconnect() {
            warn!("Disconnect broadcast failed: {e}");
        }
        self.ctx.cancel.cancel();

        let handles = std::mem::take(&mut *lock(&self.workers, "workers")?);
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("{name} thread panicked");
            }
        }
        info!("Node on port {} stopped", self.receive_port());
        Ok(())
    }
}

impl Drop for PeerNode {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Shutdown failed: {e}");
        }
    }
}
