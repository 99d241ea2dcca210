//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。

use std::path::PathBuf;

use imageflow_core::ApiKey;

use crate::storage::{ImageStore, LocalImageStore};

/// デフォルトの待ち受けアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8686";

/// デフォルトの画像保存ディレクトリ
pub const DEFAULT_STORAGE_PATH: &str = "./static/images";

/// デフォルトのアップロード最大サイズ（MB）
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 100;

/// 設定読み込みのエラー型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定または空
    #[error("環境変数 {0} が設定されていません")]
    Missing(&'static str),
    /// 値が不正
    #[error("環境変数 {name} の値が不正です: {value}")]
    Invalid {
        /// 環境変数名
        name: &'static str,
        /// 設定された値
        value: String,
    },
}

/// 起動時に読み込むGateway設定。
pub struct GatewayConfig {
    /// APIキー（`API_KEY`）
    pub api_key: String,
    /// 待ち受けアドレス（`LISTEN_ADDR`）
    pub listen_addr: String,
    /// 画像保存ディレクトリ（`STORAGE_PATH`）
    pub storage_path: PathBuf,
    /// アップロード最大サイズ（バイト、`MAX_UPLOAD_SIZE_MB` から算出）
    pub max_upload_size: usize,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"[REDACTED]")
            .field("listen_addr", &self.listen_addr)
            .field("storage_path", &self.storage_path)
            .field("max_upload_size", &self.max_upload_size)
            .finish()
    }
}

impl GatewayConfig {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から読み込む。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("API_KEY"))?;

        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let max_upload_size_mb = match lookup("MAX_UPLOAD_SIZE_MB") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|mb| *mb > 0)
                .ok_or(ConfigError::Invalid {
                    name: "MAX_UPLOAD_SIZE_MB",
                    value,
                })?,
            None => DEFAULT_MAX_UPLOAD_SIZE_MB,
        };

        Ok(Self {
            api_key,
            listen_addr,
            storage_path,
            max_upload_size: max_upload_size_mb * 1024 * 1024,
        })
    }
}

/// Gatewayの共有状態。
///
/// 起動後は読み取り専用で、全リクエストから `Arc` 経由で共有される。
pub struct GatewayState {
    /// 設定済みAPIキー
    pub api_key: ApiKey,
    /// 画像ストレージ（トレイトで抽象化）
    pub storage: Box<dyn ImageStore>,
    /// アップロード最大サイズ（バイト）
    pub max_upload_size: usize,
}

impl GatewayState {
    /// 設定から共有状態を構築する。
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            api_key: ApiKey::new(&config.api_key),
            storage: Box::new(LocalImageStore::new(config.storage_path.clone())),
            max_upload_size: config.max_upload_size,
        }
    }
}
