//! Block replication across a fixed, statically configured peer set
//! (spec §4.7): outbound gossip of freshly mined blocks, plus a periodic
//! full-chain pull to recover from missed gossip or catch up after a
//! restart.

use std::sync::Arc;
use std::time::Duration;

use ledger_core::{app::Ledger, block::Block};
use tracing::{debug, warn};

/// Pushes and pulls blocks against a fixed list of peer base URLs.
pub struct Replicator {
    ledger: Arc<Ledger>,
    peers: Vec<String>,
    client: reqwest::Client,
}

impl Replicator {
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, peers: Vec<String>) -> Self {
        Self { ledger, peers, client: reqwest::Client::new() }
    }

    /// Subscribes to locally mined blocks and gossips each to every peer.
    /// Runs until the channel closes; spawn this as its own task.
    pub async fn run_gossip(&self) {
        let mut rx = self.ledger.chain().subscribe();
        loop {
            match rx.recv().await {
                Ok(block) => self.gossip(&block).await,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "gossip receiver lagged, some blocks were not broadcast");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn gossip(&self, block: &Block) {
        for peer in &self.peers {
            let url = format!("{peer}/receber-bloco");
            match self.client.post(&url).json(block).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%peer, index = block.index, "gossiped block");
                }
                Ok(resp) => {
                    debug!(%peer, status = %resp.status(), "peer rejected gossiped block");
                }
                Err(err) => {
                    warn!(%peer, %err, "failed to gossip block to peer");
                }
            }
        }
    }

    /// Runs forever, pulling each peer's full chain every `interval` and
    /// adopting it if it is longer and valid (spec §4.3 fork choice).
    pub async fn run_periodic_pull(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.pull_once().await;
        }
    }

    /// One pass over every peer, pulling and adopting its chain if longer
    /// and valid. Split out from `run_periodic_pull` so it can be exercised
    /// directly in tests without waiting on a real timer.
    pub async fn pull_once(&self) {
        for peer in &self.peers {
            self.pull_from(peer).await;
        }
    }

    async fn pull_from(&self, peer: &str) {
        let url = format!("{peer}/blockchain");
        let blocks: Vec<Block> = match self.client.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(blocks) => blocks,
                Err(err) => {
                    warn!(%peer, %err, "failed to decode peer chain response");
                    return;
                }
            },
            Err(err) => {
                warn!(%peer, %err, "failed to pull chain from peer");
                return;
            }
        };

        match self.ledger.chain().replace(blocks) {
            Ok(true) => debug!(%peer, "adopted longer chain from peer"),
            Ok(false) => {}
            Err(err) => warn!(%peer, %err, "peer offered an invalid chain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{self, AppState};
    use ledger_core::block::TxKind;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Spins up an in-process server backed by `ledger`, acting as a peer.
    /// Returns its base URL.
    async fn spawn_peer(ledger: Arc<Ledger>) -> String {
        let state = AppState { ledger };
        let app = http::router(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Each node mints its own genesis block (spec §9 Open Question 1), so
    /// two independently created ledgers never share a tip. Gossip of a
    /// single block only lands on a peer whose chain already extends from
    /// the same history, so this first syncs the peer onto the local
    /// ledger's chain via a full pull, then gossips a freshly mined block.
    #[tokio::test]
    async fn gossip_delivers_a_block_to_a_synced_peer() {
        let local = Arc::new(Ledger::new());
        local
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "seed", "valor": 1.0}))
            .unwrap();
        let local_url = spawn_peer(Arc::clone(&local)).await;

        let peer = Arc::new(Ledger::new());
        let peer_url = spawn_peer(Arc::clone(&peer)).await;

        let syncer = Replicator::new(Arc::clone(&peer), vec![local_url]);
        syncer.pull_once().await;
        assert_eq!(peer.chain().length(), 2);

        let replicator = Replicator::new(Arc::clone(&local), vec![peer_url]);
        let block = local
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "a", "valor": 1.0}))
            .unwrap();
        replicator.gossip(&block).await;

        assert_eq!(peer.chain().length(), 3);
    }

    #[tokio::test]
    async fn pull_once_adopts_a_longer_valid_peer_chain() {
        let peer_ledger = Arc::new(Ledger::new());
        let peer_url = spawn_peer(Arc::clone(&peer_ledger)).await;
        peer_ledger
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "a", "valor": 1.0}))
            .unwrap();
        peer_ledger
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "b", "valor": 1.0}))
            .unwrap();

        let ledger = Arc::new(Ledger::new());
        let replicator = Replicator::new(Arc::clone(&ledger), vec![peer_url]);
        replicator.pull_once().await;

        assert_eq!(ledger.chain().length(), 3);
    }

    #[tokio::test]
    async fn pull_once_leaves_a_chain_unchanged_when_the_peer_is_shorter() {
        let peer_url = spawn_peer(Arc::new(Ledger::new())).await;
        let ledger = Arc::new(Ledger::new());
        ledger
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "a", "valor": 1.0}))
            .unwrap();
        let replicator = Replicator::new(Arc::clone(&ledger), vec![peer_url]);
        replicator.pull_once().await;

        assert_eq!(ledger.chain().length(), 2);
    }

    #[tokio::test]
    async fn run_periodic_pull_adopts_on_its_first_tick() {
        let peer_ledger = Arc::new(Ledger::new());
        let peer_url = spawn_peer(Arc::clone(&peer_ledger)).await;
        peer_ledger
            .chain()
            .append(TxKind::AjustarSaldo, &serde_json::json!({"usuario": "a", "valor": 1.0}))
            .unwrap();

        let ledger = Arc::new(Ledger::new());
        let replicator = Arc::new(Replicator::new(Arc::clone(&ledger), vec![peer_url]));
        let task_replicator = Arc::clone(&replicator);
        let handle = tokio::spawn(async move {
            task_replicator.run_periodic_pull(Duration::from_millis(10)).await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(ledger.chain().length(), 2);
    }
}
