//! Fetching peer chains over HTTP
//!
//! A peer exposes its chain at `GET http://{location}/chain` as
//! `{"chain": [...], "length": n}`. Every fetch is bounded by a timeout so a
//! single unreachable peer cannot stall consensus.

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use hyper::client::HttpConnector;
use hyper::{Body, Client, Uri};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// A peer's chain as it reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerChain {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<PeerChain> {
        let uri: Uri = format!("http://{}/chain", peer)
            .parse()
            .map_err(|e| ChainError::InvalidPeer(format!("{}: {}", peer, e)))?;

        let body = tokio::time::timeout(self.timeout, async {
            let response = self
                .client
                .get(uri)
                .await
                .map_err(|e| ChainError::PeerUnreachable(format!("{}: {}", peer, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ChainError::PeerUnreachable(format!(
                    "{}: responded with {}",
                    peer, status
                )));
            }

            hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| ChainError::PeerUnreachable(format!("{}: {}", peer, e)))
        })
        .await
        .map_err(|_| {
            ChainError::PeerUnreachable(format!("{}: timed out after {:?}", peer, self.timeout))
        })??;

        debug!(peer, bytes = body.len(), "sync.chain_fetched");
        serde_json::from_slice(&body).map_err(|e| ChainError::MalformedChain {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
    }
}
