use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Json, Path},
    routing::{get, post},
    Extension, Router,
};
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use delphi_bridge_core::errors::AppError;
use delphi_bridge_core::ledger::{Address, Ledger};
use delphi_bridge_core::oracle::{OracleCallArgs, OracleFacade};
use delphi_bridge_core::RpcExecutionEnv;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct AppConfig {
    server_port: u16,
    rust_log: String,
    exec_rpc_url: String,
    rpc_timeout_secs: u64,
    initial_account: String,
    initial_balance: u64,
}

fn load_config() -> Result<AppConfig, ConfigError> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(config::Environment::default())
        .set_default("server_port", 8080)?
        .set_default("rust_log", "info")?
        .set_default("exec_rpc_url", "http://127.0.0.1:13889")?
        .set_default("rpc_timeout_secs", 10)?
        .set_default(
            "initial_account",
            "17e7888aa7412a735f336d2f6d784caefabb6fa3",
        )?
        .set_default("initial_balance", 10_000_000)?
        .build()?;

    settings.try_deserialize()
}

#[derive(Clone)]
struct AppState {
    ledger: Arc<RwLock<Ledger>>,
    oracle: Arc<OracleFacade<RpcExecutionEnv>>,
}

fn parse_addr(value: &str) -> Result<Address, AppError> {
    Ok(value.parse::<Address>()?)
}

// ── Token endpoints ───────────────────────────────────────────────────────────

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct TotalSupplyResponse {
    #[schema(example = 10000000)]
    total_supply: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    address: String,
    balance: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AllowanceResponse {
    owner: String,
    spender: String,
    amount: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    #[schema(example = "17e7888aa7412a735f336d2f6d784caefabb6fa3")]
    sender_address: String,
    #[schema(example = "b47c1b554f03de86afe9bc4f2fb0866a287f6a11")]
    to: String,
    #[schema(example = 300000)]
    amount: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    sender_address: String,
    spender: String,
    amount: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct TransferFromRequest {
    /// The spender executing the delegated transfer.
    sender_address: String,
    owner: String,
    to: String,
    amount: u64,
}

#[derive(Serialize, ToSchema)]
struct TxResponse {
    success: bool,
}

#[utoipa::path(
    get,
    path = "/token/total-supply",
    responses((status = 200, description = "Fixed token supply", body = TotalSupplyResponse)),
    tag = "Token"
)]
async fn token_total_supply(
    Extension(state): Extension<AppState>,
) -> Json<TotalSupplyResponse> {
    let ledger = state.ledger.read().await;
    Json(TotalSupplyResponse {
        total_supply: ledger.total_supply(),
    })
}

#[utoipa::path(
    get,
    path = "/token/balance/{address}",
    params(("address" = String, Path, description = "Hex-encoded account address")),
    responses(
        (status = 200, description = "Account balance", body = BalanceResponse),
        (status = 400, description = "Malformed address")
    ),
    tag = "Token"
)]
async fn token_balance(
    Extension(state): Extension<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = parse_addr(&address)?;
    let ledger = state.ledger.read().await;
    Ok(Json(BalanceResponse {
        address: account.to_string(),
        balance: ledger.balance_of(&account),
    }))
}

#[utoipa::path(
    get,
    path = "/token/allowance/{owner}/{spender}",
    params(
        ("owner" = String, Path, description = "Allowance owner"),
        ("spender" = String, Path, description = "Approved spender")
    ),
    responses(
        (status = 200, description = "Remaining allowance", body = AllowanceResponse),
        (status = 400, description = "Malformed address")
    ),
    tag = "Token"
)]
async fn token_allowance(
    Extension(state): Extension<AppState>,
    Path((owner, spender)): Path<(String, String)>,
) -> Result<Json<AllowanceResponse>, AppError> {
    let owner = parse_addr(&owner)?;
    let spender = parse_addr(&spender)?;
    let ledger = state.ledger.read().await;
    Ok(Json(AllowanceResponse {
        owner: owner.to_string(),
        spender: spender.to_string(),
        amount: ledger.allowance(&owner, &spender),
    }))
}

#[utoipa::path(
    post,
    path = "/token/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer applied", body = TxResponse),
        (status = 400, description = "Invalid recipient or malformed address"),
        (status = 409, description = "Insufficient balance")
    ),
    tag = "Token"
)]
async fn token_transfer(
    Extension(state): Extension<AppState>,
    Json(payload): Json<TransferRequest>,
) -> Result<Json<TxResponse>, AppError> {
    let sender = parse_addr(&payload.sender_address)?;
    let to = parse_addr(&payload.to)?;

    state
        .ledger
        .write()
        .await
        .transfer(sender, to, payload.amount)?;
    tracing::info!(sender = %sender, to = %to, amount = payload.amount, "transfer applied");
    Ok(Json(TxResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/token/approve",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Allowance set", body = TxResponse),
        (status = 400, description = "Existing allowance must be reset to 0 first")
    ),
    tag = "Token"
)]
async fn token_approve(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<TxResponse>, AppError> {
    let owner = parse_addr(&payload.sender_address)?;
    let spender = parse_addr(&payload.spender)?;

    state
        .ledger
        .write()
        .await
        .approve(owner, spender, payload.amount)?;
    tracing::info!(owner = %owner, spender = %spender, amount = payload.amount, "allowance set");
    Ok(Json(TxResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/token/transfer-from",
    request_body = TransferFromRequest,
    responses(
        (status = 200, description = "Delegated transfer applied", body = TxResponse),
        (status = 400, description = "Invalid recipient or malformed address"),
        (status = 409, description = "Insufficient balance or allowance")
    ),
    tag = "Token"
)]
async fn token_transfer_from(
    Extension(state): Extension<AppState>,
    Json(payload): Json<TransferFromRequest>,
) -> Result<Json<TxResponse>, AppError> {
    let spender = parse_addr(&payload.sender_address)?;
    let owner = parse_addr(&payload.owner)?;
    let to = parse_addr(&payload.to)?;

    state
        .ledger
        .write()
        .await
        .transfer_from(spender, owner, to, payload.amount)?;
    tracing::info!(
        spender = %spender,
        owner = %owner,
        to = %to,
        amount = payload.amount,
        "delegated transfer applied"
    );
    Ok(Json(TxResponse { success: true }))
}

// ── Oracle endpoints ──────────────────────────────────────────────────────────

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct EventAddressResponse {
    event_address: String,
}

#[derive(Serialize, ToSchema)]
struct FinishedResponse {
    finished: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ConsensusThresholdResponse {
    /// Decimal-normalized threshold; a string because the wire value is an
    /// arbitrary-width integer.
    #[schema(example = "100000000")]
    consensus_threshold: String,
}

#[utoipa::path(
    post,
    path = "/oracle/event-address",
    request_body = OracleCallArgs,
    responses(
        (status = 200, description = "Address of the event the oracle resolves", body = EventAddressResponse),
        (status = 400, description = "Missing argument or unknown oracle type"),
        (status = 502, description = "Execution node failure")
    ),
    tag = "Oracle"
)]
async fn oracle_event_address(
    Extension(state): Extension<AppState>,
    Json(args): Json<OracleCallArgs>,
) -> Result<Json<EventAddressResponse>, AppError> {
    let event_address = state.oracle.event_address(&args).await?;
    Ok(Json(EventAddressResponse {
        event_address: event_address.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/oracle/finished",
    request_body = OracleCallArgs,
    responses(
        (status = 200, description = "Whether the oracle has finished", body = FinishedResponse),
        (status = 400, description = "Missing argument or unknown oracle type"),
        (status = 502, description = "Execution node failure")
    ),
    tag = "Oracle"
)]
async fn oracle_finished(
    Extension(state): Extension<AppState>,
    Json(args): Json<OracleCallArgs>,
) -> Result<Json<FinishedResponse>, AppError> {
    let finished = state.oracle.finished(&args).await?;
    Ok(Json(FinishedResponse { finished }))
}

#[utoipa::path(
    post,
    path = "/oracle/consensus-threshold",
    request_body = OracleCallArgs,
    responses(
        (status = 200, description = "Decimal-normalized consensus threshold", body = ConsensusThresholdResponse),
        (status = 400, description = "Missing argument or unknown oracle type"),
        (status = 502, description = "Execution node failure")
    ),
    tag = "Oracle"
)]
async fn oracle_consensus_threshold(
    Extension(state): Extension<AppState>,
    Json(args): Json<OracleCallArgs>,
) -> Result<Json<ConsensusThresholdResponse>, AppError> {
    let threshold = state.oracle.consensus_threshold(&args).await?;
    Ok(Json(ConsensusThresholdResponse {
        consensus_threshold: threshold.to_string(),
    }))
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        token_total_supply,
        token_balance,
        token_allowance,
        token_transfer,
        token_approve,
        token_transfer_from,
        oracle_event_address,
        oracle_finished,
        oracle_consensus_threshold
    ),
    components(schemas(
        TotalSupplyResponse, BalanceResponse, AllowanceResponse,
        TransferRequest, ApproveRequest, TransferFromRequest, TxResponse,
        OracleCallArgs,
        EventAddressResponse, FinishedResponse, ConsensusThresholdResponse
    )),
    tags(
        (name = "Token", description = "Token ledger operations"),
        (name = "Oracle", description = "Read-only oracle contract calls")
    ),
    info(
        title = "Delphi Bridge API",
        version = "0.1.0",
        description = "Token ledger and oracle call facade"
    )
)]
struct ApiDoc;

async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() {
    // -------------------------------
    // Initialize Tracing / Logging
    // -------------------------------
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Delphi Bridge starting...");

    // -------------------------------
    // Load configuration
    // -------------------------------
    let config = load_config().expect("Failed to load configuration");
    tracing::info!("Delphi Bridge initialized with config: {:?}", config);

    // -------------------------------
    // Ledger and oracle facade
    // -------------------------------
    let initial_account: Address = config
        .initial_account
        .parse()
        .expect("initial_account is not a valid address");
    let ledger = Arc::new(RwLock::new(Ledger::new(
        initial_account,
        config.initial_balance,
    )));
    tracing::info!(
        account = %initial_account,
        supply = config.initial_balance,
        "ledger initialized"
    );

    let env = RpcExecutionEnv::new(
        config.exec_rpc_url.clone(),
        Duration::from_secs(config.rpc_timeout_secs),
    );
    let oracle = Arc::new(OracleFacade::new(env));

    let state = AppState { ledger, oracle };

    // -------------------------------
    // Web Server Setup
    // -------------------------------
    let cors = CorsLayer::new().allow_origin(Any);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(|| async { "Hello from Delphi Bridge!" }))
        .route("/health", get(health_check))
        .route("/token/total-supply", get(token_total_supply))
        .route("/token/balance/:address", get(token_balance))
        .route("/token/allowance/:owner/:spender", get(token_allowance))
        .route("/token/transfer", post(token_transfer))
        .route("/token/approve", post(token_approve))
        .route("/token/transfer-from", post(token_transfer_from))
        .route("/oracle/event-address", post(oracle_event_address))
        .route("/oracle/finished", post(oracle_finished))
        .route(
            "/oracle/consensus-threshold",
            post(oracle_consensus_threshold),
        )
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // -------------------------------
    // Run Server
    // -------------------------------
    let bind_addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(
        "Server listening on http://{}",
        listener.local_addr().unwrap()
    );
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui",
        listener.local_addr().unwrap()
    );

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
