//! # Gatewayエンドポイント
//!
//! 認証エンドポイント（`/api/validate-api-key`）は `crate::auth` を参照。

pub mod health;
pub mod images;
pub mod upload;

pub use health::handle_health;
pub use images::handle_list_images;
pub use upload::handle_upload;
