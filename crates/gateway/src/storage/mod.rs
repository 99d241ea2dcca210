//! # 画像ストレージ
//!
//! 受付済み画像の保存先の抽象インターフェース。
//! ローカルファイルシステム実装は `local` サブモジュールを参照。

pub mod local;

pub use local::LocalImageStore;

use crate::error::GatewayError;

/// 画像ストレージの抽象インターフェース。
///
/// Gatewayはフォーマット判定済みのバイト列のみを渡す。
/// 運用者はローカルディスク以外のバックエンドを実装として選択できる。
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// 画像を指定ファイル名で保存する。
    async fn put(&self, filename: &str, data: &[u8]) -> Result<(), GatewayError>;

    /// 保存済みのファイル名を列挙する（画像以外を含みうる）。
    async fn list(&self) -> Result<Vec<String>, GatewayError>;
}
