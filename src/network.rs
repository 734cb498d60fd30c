//! Registry of known peer nodes

use crate::error::{ChainError, Result};
use hyper::Uri;
use std::collections::BTreeSet;

/// Peer network locations (`host[:port]`), iterated in sorted order.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: BTreeSet<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer given as a URL (`http://host:port/...`) or a bare
    /// `host:port`. Returns the stored network location.
    pub fn register(&mut self, address: &str) -> Result<String> {
        let location = parse_location(address)?;
        self.nodes.insert(location.clone());
        Ok(location)
    }

    /// Register every address, or none of them if any fails to parse.
    pub fn register_all(&mut self, addresses: &[String]) -> Result<()> {
        let locations = addresses
            .iter()
            .map(|address| parse_location(address))
            .collect::<Result<Vec<_>>>()?;
        self.nodes.extend(locations);
        Ok(())
    }

    pub fn contains(&self, location: &str) -> bool {
        self.nodes.contains(location)
    }

    pub fn list_peers(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parse_location(address: &str) -> Result<String> {
    let uri: Uri = address
        .trim()
        .parse()
        .map_err(|e| ChainError::InvalidPeer(format!("{}: {}", address, e)))?;
    uri.authority()
        .map(|authority| authority.as_str().to_string())
        .filter(|location| !location.is_empty())
        .ok_or_else(|| ChainError::InvalidPeer(format!("{}: no host", address)))
}
