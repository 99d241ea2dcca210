//! # POST /api/upload
//!
//! 画像のアップロード受付。
//!
//! リクエスト本文のバイト列のみからフォーマットを判定し、
//! 判定結果の正規拡張子でストレージに保存する。
//! ファイル名やContent-Typeヘッダは参照しない。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use imageflow_core::detect_image_format;
use imageflow_types::UploadResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /api/upload — 画像アップロード。
///
/// `require_api_key` の後段に置かれる前提。
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<UploadResponse>, GatewayError> {
    if body.is_empty() {
        return Err(GatewayError::BadRequest(
            "リクエスト本文が空です".to_string(),
        ));
    }

    let descriptor = detect_image_format(&body)?;

    let filename = format!("{}{}", uuid::Uuid::new_v4(), descriptor.extension);
    state.storage.put(&filename, &body).await?;

    tracing::info!(
        filename = %filename,
        format = descriptor.format,
        size = body.len(),
        "画像を保存しました"
    );

    Ok(Json(UploadResponse {
        filename,
        format: descriptor.format.to_string(),
        extension: descriptor.extension.to_string(),
        mime_type: descriptor.mime_type.to_string(),
        size: body.len() as u64,
    }))
}
