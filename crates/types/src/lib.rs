//! # ImageFlow 共有型定義
//!
//! GatewayのHTTP APIで送受信するJSON構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - フィールド名: snake_case
//! - 省略可能なフィールドは `None` のときシリアライズしない

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 認証
// ---------------------------------------------------------------------------

/// APIキー検証結果。
/// `POST /api/validate-api-key` のレスポンス、および認証失敗時の共通レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// APIキーが有効か
    pub valid: bool,
    /// 失敗時のエラーメッセージ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 失敗時のエラーコード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl AuthResponse {
    /// 検証成功のレスポンス。
    pub fn valid() -> Self {
        Self {
            valid: true,
            error: None,
            code: None,
        }
    }
}

// ---------------------------------------------------------------------------
// エラー
// ---------------------------------------------------------------------------

/// 認証以外のエラーレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 安定したエラーコード（例: "UNSUPPORTED_IMAGE_FORMAT"）
    pub code: String,
    /// 人間向けのエラーメッセージ
    pub error: String,
}

// ---------------------------------------------------------------------------
// アップロード
// ---------------------------------------------------------------------------

/// `POST /api/upload` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 保存されたファイル名（`<uuid><extension>`）
    pub filename: String,
    /// 判定されたフォーマット名
    pub format: String,
    /// 正規の拡張子
    pub extension: String,
    /// 正規のMIMEタイプ
    pub mime_type: String,
    /// バイト数
    pub size: u64,
}

/// `GET /api/images` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageListResponse {
    /// 画像ファイル名の一覧（辞書順）
    pub images: Vec<String>,
}
