//! rota-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! document store, and serves the Rota JSON API over HTTP.
//!
//! # Issuing a token
//!
//! ```text
//! cargo run -p rota-server -- --generate-token alice
//! ```
//!
//! prints a fresh bearer token and the `[[identities]]` entry to paste into
//! the config file.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderValue, Method, StatusCode, header},
  middleware,
  response::Response,
};
use clap::Parser;
use rand_core::{OsRng, RngCore as _};
use rota_api::{AppState, TokenTable, auth::token_digest};
use rota_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Rota restaurant listing server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a new bearer token for this identity and exit.
  #[arg(long, value_name = "UID")]
  generate_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(uid) = cli.generate_token {
    let token = generate_token();
    println!("token: {token}\n");
    println!("[[identities]]");
    println!("uid = {uid:?}");
    println!("token_sha256 = \"{}\"", token_digest(&token));
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;
  if cfg.identities.is_empty() {
    tracing::warn!("no identities configured; every mutating call will be rejected");
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let tokens = TokenTable::new(cfg.identities.iter().cloned());
  tracing::info!(
    identities = tokens.len(),
    ownership = ?cfg.ownership,
    "store opened at {}",
    cfg.store_path.display()
  );
  let state = AppState::new(Arc::new(store), cfg.ownership, tokens);

  let address = cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state)).await.context("server error")?;

  Ok(())
}

/// The API router with CORS and request tracing.
fn app(state: AppState<SqliteStore>) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

  rota_api::router(state)
    .layer(cors)
    .layer(middleware::map_response(preflight_no_content))
    .layer(TraceLayer::new_for_http())
}

/// Answer CORS preflights with `204` rather than an empty `200`.
async fn preflight_no_content(method: Method, mut res: Response) -> Response {
  let is_preflight = method == Method::OPTIONS
    && res.status() == StatusCode::OK
    && res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS);
  if is_preflight {
    *res.status_mut() = StatusCode::NO_CONTENT;
    res
      .headers_mut()
      .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
  }
  res
}

/// 32 random bytes, hex-encoded.
fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}
