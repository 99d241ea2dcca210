//! # Gateway エラー型
//!
//! 全エンドポイントとミドルウェアで共通のエラー型。
//! 認証失敗は理由に関わらず同一のレスポンスを返す。

use axum::http::StatusCode;
use axum::Json;
use imageflow_core::{AuthError, FormatError};
use imageflow_types::{AuthResponse, ErrorResponse};

/// 認証失敗時のエラーコード。
pub const INVALID_API_KEY_CODE: &str = "INVALID_API_KEY";

/// 認証失敗時のエラーメッセージ。
pub const INVALID_API_KEY_MESSAGE: &str = "Invalid API key";

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// APIキー認証に失敗（理由はログ専用）
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    /// 画像フォーマットとして解釈できない
    #[error(transparent)]
    UnsupportedFormat(#[from] FormatError),
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// ストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
}

impl GatewayError {
    fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized(_) => INVALID_API_KEY_CODE,
            GatewayError::UnsupportedFormat(_) => "UNSUPPORTED_IMAGE_FORMAT",
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 認証失敗は理由を含めず常に同じ本文を返す
        if let GatewayError::Unauthorized(_) = self {
            let body = AuthResponse {
                valid: false,
                error: Some(INVALID_API_KEY_MESSAGE.to_string()),
                code: Some(INVALID_API_KEY_CODE.to_string()),
            };
            return (status, Json(body)).into_response();
        }

        let body = ErrorResponse {
            code: self.code().to_string(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
