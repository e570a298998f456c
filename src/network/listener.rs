use crate::core::{Block, ProofOfWork};
use crate::error::Result;
use crate::network::codec;
use crate::network::message::{DataResult, Envelope, Message};
use crate::network::node::{NodeContext, WorkerState};
use crate::network::sync::ChashVote;
use crate::network::transport::{Poll, PollSource};
use crate::utils::lock;
use log::{debug, error, info, warn};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

/// Listener worker: poll the receive socket until cancelled.
///
/// An empty socket costs one `poll_backoff` sleep. A socket error stops the
/// worker and is recorded as [`WorkerState::Failed`] so the node can report
/// it; the rest of the node keeps running.
pub(crate) fn run<S>(ctx: Arc<NodeContext>, mut source: S, votes: Sender<ChashVote>)
where
    S: PollSource,
{
    info!("Listener started on port {}", ctx.outbound.receive_port());
    loop {
        if ctx.cancel.is_cancelled() {
            ctx.set_listener_state(WorkerState::Stopped);
            debug!("Listener stopped");
            return;
        }
        match source.poll() {
            Ok(Poll::Datagram(bytes)) => handle_datagram(&ctx, bytes, &votes),
            Ok(Poll::Empty) => thread::sleep(ctx.config.poll_backoff),
            Err(e) => {
                error!("Listener failed, node can no longer receive: {e}");
                ctx.set_listener_state(WorkerState::Failed(e.to_string()));
                return;
            }
        }
    }
}

/// Decode one datagram and act on it. Malformed input is logged and dropped.
pub(crate) fn handle_datagram(ctx: &NodeContext, bytes: &[u8], votes: &Sender<ChashVote>) {
    let envelope = match codec::decode(bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Dropping malformed datagram of {} bytes: {e}", bytes.len());
            return;
        }
    };
    if envelope.receive_port == ctx.outbound.receive_port() {
        return;
    }
    let kind = envelope.message.message_type();
    if let Err(e) = dispatch(ctx, envelope, votes) {
        warn!("Failed to handle {kind:?}: {e}");
    }
}

fn dispatch(ctx: &NodeContext, envelope: Envelope, votes: &Sender<ChashVote>) -> Result<()> {
    let peer = envelope.receive_port;
    debug!("Received {:?} from {peer}", envelope.message.message_type());

    match envelope.message {
        Message::Connect => {
            ctx.outbound.send(Message::ConnectAck, peer)?;
            ctx.peers.add_peer(peer)?;
        }
        Message::ConnectAck => {
            ctx.peers.add_peer(peer)?;
        }
        Message::Disconnect => {
            ctx.peers.evict_peer(peer)?;
        }
        Message::RequestChash { idx } => {
            let hash = lock(&ctx.chain, "chain")?.get_hash(idx).copied();
            // Unknown index: stay silent.
            if let Some(hash) = hash {
                ctx.outbound.send(Message::ResponseChash { idx, hash }, peer)?;
            }
        }
        Message::ResponseChash { idx, hash } => {
            let vote = ChashVote {
                idx,
                port: peer,
                hash,
            };
            if votes.send(vote).is_err() {
                debug!("Synchronizer gone; dropping vote for index {idx}");
            }
        }
        Message::RequestData { idx, hash: _ } => {
            let block = lock(&ctx.chain, "chain")?.get_block(idx).cloned();
            if let Some(block) = block {
                let response = Message::ResponseData(DataResult {
                    idx,
                    nonce: block.get_nonce(),
                    prev_hash: *block.get_prev_hash(),
                    curr_hash: *block.get_curr_hash(),
                    data: *block.get_data(),
                });
                ctx.outbound.send(response, peer)?;
            }
        }
        Message::ResponseData(res) => {
            apply_remote_block(ctx, res, peer)?;
        }
    }
    Ok(())
}

/// Store a block sent by a peer and ask everyone for the next index.
///
/// Remote proof-of-work is trusted: a block that fails validation is still
/// applied, with a warning.
fn apply_remote_block(ctx: &NodeContext, res: DataResult, peer: u16) -> Result<()> {
    let idx = res.idx;
    let candidate = Block::from_parts(idx, res.nonce, res.prev_hash, res.curr_hash, res.data);
    if !ProofOfWork::validate(&candidate) {
        warn!("Block {idx} from {peer} fails proof-of-work; applying it anyway");
    }

    lock(&ctx.chain, "chain")?.update_block(
        idx,
        res.nonce,
        res.prev_hash,
        res.curr_hash,
        res.data,
    )?;
    debug!("Applied block {idx} from {peer}");

    ctx.broadcast_to_peers(Message::RequestChash { idx: idx + 1 })?;
    Ok(())
}
