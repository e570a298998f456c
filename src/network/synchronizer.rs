use crate::network::message::Message;
use crate::network::node::NodeContext;
use crate::network::sync::{ChashVote, DataRequest, SyncAction, SyncState};
use log::{debug, info, warn};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

/// Synchronizer worker: drain votes from the listener and drive the
/// majority-vote rounds until cancelled.
pub(crate) fn run(ctx: Arc<NodeContext>, votes: Receiver<ChashVote>) {
    info!("Synchronizer started");
    request_chash(&ctx, 0);

    let mut state = SyncState::new(
        ctx.config.vote_window,
        ctx.config.resync_interval,
        Instant::now(),
    );

    while !ctx.cancel.is_cancelled() {
        match votes.recv_timeout(ctx.config.poll_backoff) {
            Ok(vote) => {
                if let Some(request) = state.on_vote(vote, Instant::now()) {
                    request_data(&ctx, request);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Vote channel closed");
                break;
            }
        }

        for action in state.on_tick(Instant::now()) {
            match action {
                SyncAction::RequestData(request) => request_data(&ctx, request),
                SyncAction::Resync => request_chash(&ctx, 0),
            }
        }
    }
    debug!("Synchronizer stopped");
}

fn request_chash(ctx: &NodeContext, idx: u64) {
    if let Err(e) = ctx.broadcast_to_peers(Message::RequestChash { idx }) {
        warn!("Failed to request hash {idx}: {e}");
    }
}

fn request_data(ctx: &NodeContext, request: DataRequest) {
    debug!(
        "Requesting block {} ({}) from {:?}",
        request.idx, request.hash, request.ports
    );
    let message = Message::RequestData {
        idx: request.idx,
        hash: request.hash,
    };
    if let Err(e) = ctx.outbound.broadcast(message, request.ports) {
        warn!("Failed to request block {}: {e}", request.idx);
    }
}
