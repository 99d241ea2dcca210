//! # Gateway認証
//!
//! APIキーによるリクエスト認証。
//!
//! - [`require_api_key`]: 後続ハンドラの前段に置くミドルウェア
//! - [`handle_validate_api_key`]: APIキー単体の検証エンドポイント
//!
//! どちらも同じ抽出・比較ロジックを使い、失敗時は同一のエラーを返す。

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use imageflow_core::{extract_bearer, mask_api_key, AuthError, RejectReason};
use imageflow_types::AuthResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// 検証失敗時のログ出力用情報。
struct Rejection {
    error: AuthError,
    /// 比較まで到達した場合のみマスク済みキーを持つ
    masked_key: Option<String>,
}

/// リクエストヘッダのAPIキーを検証する。
fn authenticate(state: &GatewayState, headers: &HeaderMap) -> Result<(), Rejection> {
    let header = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| Rejection {
            error: AuthError::Unauthorized(RejectReason::MalformedHeader),
            masked_key: None,
        })?;

    state.api_key.authorize(header).map(|_| ()).map_err(|error| {
        let masked_key = match error.reason() {
            RejectReason::KeyMismatch => extract_bearer(header).ok().map(mask_api_key),
            _ => None,
        };
        Rejection { error, masked_key }
    })
}

/// APIキー必須ミドルウェア。
///
/// 検証に成功した場合のみ後続ハンドラを呼び出す。
/// 失敗時は後続を呼ばずに共通の認証エラーを返す。
pub async fn require_api_key(
    State(state): State<Arc<GatewayState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if let Err(rejection) = authenticate(&state, req.headers()) {
        let path = req.uri().path();
        let method = req.method();
        match &rejection.masked_key {
            Some(masked_key) => tracing::warn!(
                path = %path,
                method = %method,
                reason = %rejection.error.reason(),
                masked_key = %masked_key,
                "APIキーの検証に失敗しました"
            ),
            None => tracing::warn!(
                path = %path,
                method = %method,
                reason = %rejection.error.reason(),
                "Authorizationヘッダが不正です"
            ),
        }
        return Err(rejection.error.into());
    }

    Ok(next.run(req).await)
}

/// POST /api/validate-api-key — APIキー単体の検証。
///
/// 成功時は `{"valid":true}` を返す。
pub async fn handle_validate_api_key(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, GatewayError> {
    match authenticate(&state, &headers) {
        Ok(()) => {
            tracing::debug!("APIキーの検証に成功しました");
            Ok(Json(AuthResponse::valid()))
        }
        Err(rejection) => {
            tracing::warn!(
                reason = %rejection.error.reason(),
                masked_key = rejection.masked_key.as_deref().unwrap_or("-"),
                "APIキーの検証に失敗しました"
            );
            Err(rejection.error.into())
        }
    }
}
