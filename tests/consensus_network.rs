//! Consensus between live nodes over real sockets

use axum_test::TestServer;
use ledgerchain::api::build_api_router;
use ledgerchain::config::Config;
use ledgerchain::node::Node;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

fn test_node() -> Arc<Node> {
    let mut config = Config::default();
    config.wallet.key_bits = 1024;
    Arc::new(Node::new(&config))
}

/// Serve `node` on an ephemeral loopback port.
async fn spawn_peer(node: Arc<Node>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_api_router(node)).await.unwrap();
    });
    addr
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_longer_peer_chain_replaces_local() {
    let peer = test_node();
    peer.mine().await.unwrap();
    peer.mine().await.unwrap();
    let peer_addr = spawn_peer(peer.clone()).await;

    let local = test_node();
    local.mine().await.unwrap();
    let server = TestServer::new(build_api_router(local.clone())).unwrap();

    let response = server
        .post("/nodes/register")
        .json(&json!({ "nodes": [format!("http://{}", peer_addr)] }))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server.get("/nodes/resolve").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "Our chain was replaced");
    assert_eq!(json["replaced"], true);
    assert_eq!(json["new_chain"].as_array().unwrap().len(), 3);

    let local_chain = local.ledger.read().await.blocks().to_vec();
    let peer_chain = peer.ledger.read().await.blocks().to_vec();
    assert_eq!(local_chain, peer_chain);

    // Balances follow the adopted chain: the local miner's reward is gone.
    let ledger = local.ledger.read().await;
    assert_eq!(ledger.balance(local.node_identifier()), 0);
    assert_eq!(ledger.balance(peer.node_identifier()), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_equal_length_peers_do_not_replace() {
    let mut peer_addrs = Vec::new();
    for _ in 0..2 {
        let peer = test_node();
        peer.mine().await.unwrap();
        peer_addrs.push(spawn_peer(peer).await.to_string());
    }

    let local = test_node();
    local.mine().await.unwrap();
    let before = local.ledger.read().await.blocks().to_vec();
    local.register_peers(&peer_addrs).unwrap();

    assert!(!local.resolve_conflicts().await.unwrap());
    assert_eq!(local.ledger.read().await.blocks(), before.as_slice());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_peer_is_skipped() {
    let peer = test_node();
    peer.mine().await.unwrap();
    peer.mine().await.unwrap();
    let peer_addr = spawn_peer(peer).await;

    let local = test_node();
    local
        .register_peers(&["127.0.0.1:1".to_string(), peer_addr.to_string()])
        .unwrap();

    assert!(local.resolve_conflicts().await.unwrap());
    assert_eq!(local.ledger.read().await.len(), 3);
}
