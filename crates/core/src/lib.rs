//! # ImageFlow Core
//!
//! アップロード受付の信頼境界を構成する2つの独立したコンポーネントを提供する。
//!
//! ## コンポーネント
//! - [`auth`]: Bearerトークンの抽出、APIキーの固定時間比較、ログ用マスク
//! - [`format`]: バイト列の構造による画像フォーマット判定、拡張子による事前フィルタ
//!
//! 両者は状態を共有しない。HTTPルーティングやストレージは呼び出し側が担う。

pub mod auth;
pub mod format;

pub use auth::{extract_bearer, mask_api_key, ApiKey, AuthError, RejectReason};
pub use format::{
    detect_image_format, is_image_file, FormatDescriptor, FormatError,
    SUPPORTED_IMAGE_EXTENSIONS,
};
