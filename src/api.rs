//! HTTP interface for the ledger node
//!
//! JSON endpoints for mining, transactions, wallets, peers and consensus.
//! Paths sit at the root because peers fetch each other's `/chain` directly.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;
use crate::transaction::{Admission, Transaction, TransferPayload};

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::WalletNotFound(_)
            | ChainError::BlockNotFound(_)
            | ChainError::PeerNotFound(_) => ApiError::NotFound(err.to_string()),
            ChainError::InvalidPeer(_) | ChainError::CryptoError(_) => {
                ApiError::InvalidInput(err.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

// Malformed bodies, query strings and path segments are client input errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn missing_values() -> ApiError {
    ApiError::InvalidInput("Missing values".to_string())
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct NewTransactionRequest {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
}

#[derive(Deserialize)]
struct SubmitTransactionRequest {
    sender_wallet_address: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
    /// Hex-encoded signature.
    signature: Option<String>,
}

#[derive(Deserialize)]
struct SignTransactionRequest {
    sender_wallet_address: Option<String>,
    /// Either a string (signed as its UTF-8 bytes) or a
    /// `{sender, recipient, amount}` object (signed as the transfer payload).
    transaction_data: Option<Value>,
}

#[derive(Deserialize)]
struct RegisterNodesRequest {
    nodes: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ImportWalletRequest {
    public_key: Option<String>,
}

#[derive(Deserialize)]
struct BalanceQuery {
    user_address: Option<String>,
}

#[derive(Serialize)]
struct ChainResponse<'a> {
    chain: &'a [Block],
    length: usize,
}

#[derive(Serialize)]
struct MineResponse {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

#[derive(Serialize)]
struct ResolveResponse<'a> {
    message: &'static str,
    replaced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_chain: Option<&'a [Block]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<&'a [Block]>,
}

fn admission_response(outcome: Admission) -> Result<(StatusCode, Json<Value>), ApiError> {
    match outcome {
        Admission::Accepted(index) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": format!("Transaction will be added to Block {}", index),
                "index": index
            })),
        )),
        Admission::InvalidSignature => Err(ApiError::InvalidInput(
            "Invalid transaction signature".to_string(),
        )),
        Admission::InsufficientBalance => {
            Err(ApiError::InvalidInput("Insufficient balance".to_string()))
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Mining & chain
        .route("/mine", get(mine))
        .route("/chain", get(full_chain))
        .route("/block/:block_index", get(get_block))
        .route("/blockchain/stats", get(chain_stats))
        // Transactions
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/submit", post(submit_transaction))
        .route("/transaction/sign", post(sign_transaction))
        .route("/balance", get(get_balance))
        // Wallets
        .route("/wallet/new", get(new_wallet))
        .route("/wallet/import", post(import_wallet))
        // Peers & consensus
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .route("/network/status", get(network_status))
        .route("/node/:node_url", get(get_node))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on `addr` until the process stops.
pub async fn run_api_server(node: Arc<Node>, addr: SocketAddr) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "api.listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(MineResponse {
        message: "New block forged",
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn full_chain(State(node): State<Arc<Node>>) -> Response {
    let ledger = node.ledger.read().await;
    Json(ChainResponse {
        chain: ledger.blocks(),
        length: ledger.len(),
    })
    .into_response()
}

async fn get_block(
    State(node): State<Arc<Node>>,
    block_index: Result<Path<usize>, PathRejection>,
) -> Result<Json<Block>, ApiError> {
    let Path(block_index) = block_index?;
    let ledger = node.ledger.read().await;
    ledger
        .get_block(block_index)
        .cloned()
        .map(Json)
        .ok_or_else(|| ChainError::BlockNotFound(block_index).into())
}

async fn chain_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    Json(json!({
        "total_blocks": ledger.len(),
        "total_transactions": ledger.total_transactions()
    }))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    let (Some(sender), Some(recipient), Some(amount)) = (req.sender, req.recipient, req.amount)
    else {
        return Err(missing_values());
    };

    let outcome = node
        .submit_transaction(Transaction::new(sender, recipient, amount, None))
        .await?;
    admission_response(outcome)
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<SubmitTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    let (Some(sender), Some(recipient), Some(amount), Some(signature)) = (
        req.sender_wallet_address,
        req.recipient,
        req.amount,
        req.signature,
    ) else {
        return Err(missing_values());
    };

    // Undecodable hex can never verify; let admission reject it.
    let signature = hex::decode(signature.trim()).ok();
    let outcome = node
        .submit_transaction(Transaction::new(sender, recipient, amount, signature))
        .await?;
    admission_response(outcome)
}

async fn sign_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<SignTransactionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let (Some(address), Some(data)) = (req.sender_wallet_address, req.transaction_data) else {
        return Err(missing_values());
    };

    let payload = match data {
        Value::String(text) => text.into_bytes(),
        other => serde_json::from_value::<TransferPayload>(other)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid transaction_data: {}", e)))?
            .to_bytes()?,
    };

    let signature = node.wallets.sign(&address, &payload)?;
    Ok(Json(json!({ "signature": hex::encode(signature) })))
}

async fn get_balance(
    State(node): State<Arc<Node>>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let address = query
        .user_address
        .ok_or_else(|| ApiError::InvalidInput("Missing user_address".to_string()))?;
    let balance = node.ledger.read().await.balance(&address);
    Ok(Json(json!({ "balance": balance, "address": address })))
}

async fn new_wallet(State(node): State<Arc<Node>>) -> Result<Json<Value>, ApiError> {
    let address = node.generate_wallet().await?;
    Ok(Json(json!({ "wallet_address": address })))
}

async fn import_wallet(
    State(node): State<Arc<Node>>,
    payload: Result<Json<ImportWalletRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    let pem = req.public_key.ok_or_else(missing_values)?;
    let address = node.wallets.import_public_key(&pem)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "wallet_address": address })),
    ))
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    payload: Result<Json<RegisterNodesRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    let nodes = req.nodes.ok_or_else(|| {
        ApiError::InvalidInput("Error: Please supply a valid list of nodes".to_string())
    })?;

    let total_nodes = node.register_peers(&nodes)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "New nodes have been added",
            "total_nodes": total_nodes
        })),
    ))
}

async fn resolve(State(node): State<Arc<Node>>) -> Result<Response, ApiError> {
    let replaced = node.resolve_conflicts().await?;
    let ledger = node.ledger.read().await;

    let response = if replaced {
        ResolveResponse {
            message: "Our chain was replaced",
            replaced,
            new_chain: Some(ledger.blocks()),
            chain: None,
        }
    } else {
        ResolveResponse {
            message: "Our chain is authoritative",
            replaced,
            new_chain: None,
            chain: Some(ledger.blocks()),
        }
    };
    Ok(Json(response).into_response())
}

async fn network_status(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let registry = node.registry.read();
    Json(json!({
        "total_nodes": registry.len(),
        "nodes": registry.list_peers()
    }))
}

async fn get_node(
    State(node): State<Arc<Node>>,
    Path(node_url): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !node.registry.read().contains(&node_url) {
        return Err(ChainError::PeerNotFound(node_url).into());
    }
    Ok(Json(json!({ "node_url": node_url, "status": "online" })))
}
