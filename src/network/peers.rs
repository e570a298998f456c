use crate::error::Result;
use crate::utils::lock;
use log::info;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Receive ports of the peers this node has shaken hands with.
///
/// A port is the only identity a peer has. Every read and write takes the
/// lock; callers get copies, never a guard.
pub struct PeerSet {
    inner: Mutex<BTreeSet<u16>>,
}

impl Default for PeerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerSet {
    pub fn new() -> PeerSet {
        PeerSet {
            inner: Mutex::new(BTreeSet::new()),
        }
    }

    /// Returns whether the port was new.
    pub fn add_peer(&self, port: u16) -> Result<bool> {
        let added = lock(&self.inner, "peer set")?.insert(port);
        if added {
            info!("Peer joined: {port}");
        }
        Ok(added)
    }

    /// Returns whether the port was known.
    pub fn evict_peer(&self, port: u16) -> Result<bool> {
        let removed = lock(&self.inner, "peer set")?.remove(&port);
        if removed {
            info!("Peer left: {port}");
        }
        Ok(removed)
    }

    /// Snapshot of the peer ports in ascending order.
    pub fn get_peers(&self) -> Result<Vec<u16>> {
        Ok(lock(&self.inner, "peer set")?.iter().copied().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.inner, "peer set")?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_evict() {
        let peers = PeerSet::new();
        assert_eq!(peers.len().unwrap(), 0);
        assert!(peers.add_peer(50010).unwrap());
        assert!(!peers.add_peer(50010).unwrap());
        assert_eq!(peers.get_peers().unwrap(), vec![50010]);

        assert!(peers.evict_peer(50010).unwrap());
        assert!(!peers.evict_peer(50010).unwrap());
        assert_eq!(peers.len().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let peers = PeerSet::new();
        for port in [50030, 50001, 50020] {
            peers.add_peer(port).unwrap();
        }
        assert_eq!(peers.get_peers().unwrap(), vec![50001, 50020, 50030]);
    }
}
