//! # ImageFlow Gateway
//!
//! 画像アップロードの受付ゲート。
//!
//! ## 役割
//! - APIキー認証（固定時間比較、失敗理由を外部に漏らさない）
//! - アップロードされたバイト列の構造による画像フォーマット判定
//! - 判定済み画像のストレージへの保存
//!
//! ## API エンドポイント
//! - `POST /api/validate-api-key` — APIキー検証
//! - `POST /api/upload` — 画像アップロード（APIキー必須）
//! - `GET /api/images` — 保存済み画像一覧（APIキー必須）
//! - `GET /health` — 死活監視

mod auth;
mod config;
mod endpoints;
mod error;
mod storage;
#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tracing_subscriber::EnvFilter;

use crate::auth::{handle_validate_api_key, require_api_key};
use crate::config::{GatewayConfig, GatewayState};
use crate::endpoints::{handle_health, handle_list_images, handle_upload};

/// ルーターを構築する。
///
/// アップロードと一覧は `require_api_key` の後段に置く。
fn build_router(state: Arc<GatewayState>) -> axum::Router {
    let protected = axum::Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/images", get(handle_list_images))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    axum::Router::new()
        .route("/api/validate-api-key", post(handle_validate_api_key))
        .route("/health", get(handle_health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        storage_path = %config.storage_path.display(),
        max_upload_size = config.max_upload_size,
        "設定を読み込みました"
    );

    let state = Arc::new(GatewayState::from_config(&config));
    let app = build_router(state);

    tracing::info!("Gatewayを {} で起動します", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
