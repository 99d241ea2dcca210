//! # GET /api/images
//!
//! 保存済み画像の一覧。拡張子による事前フィルタのみを行う。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use imageflow_core::is_image_file;
use imageflow_types::ImageListResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// GET /api/images — 保存済み画像ファイル名の一覧。
pub async fn handle_list_images(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<ImageListResponse>, GatewayError> {
    let mut images: Vec<String> = state
        .storage
        .list()
        .await?
        .into_iter()
        .filter(|name| is_image_file(name))
        .collect();
    images.sort();

    Ok(Json(ImageListResponse { images }))
}
