//! # テスト用共通ヘルパー
//!
//! 認証・エンドポイントのテストで共有するモックストレージとサーバー起動処理。

use std::sync::{Arc, Mutex};

use imageflow_core::ApiKey;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::storage::ImageStore;

/// テスト用APIキー
pub const TEST_API_KEY: &str = "test-api-key-0123456789";

/// テスト用アップロード上限（1MB）
pub const TEST_MAX_UPLOAD_SIZE: usize = 1024 * 1024;

/// メモリ上に保存するモックImageStore。
#[derive(Default, Clone)]
pub struct MemoryStore {
    pub files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

#[async_trait::async_trait]
impl ImageStore for MemoryStore {
    async fn put(&self, filename: &str, data: &[u8]) -> Result<(), GatewayError> {
        self.files
            .lock()
            .unwrap()
            .push((filename.to_string(), data.to_vec()));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }
}

/// 常に失敗するモックImageStore。
pub struct FailingStore;

#[async_trait::async_trait]
impl ImageStore for FailingStore {
    async fn put(&self, _filename: &str, _data: &[u8]) -> Result<(), GatewayError> {
        Err(GatewayError::Storage("disk full".to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, GatewayError> {
        Err(GatewayError::Storage("unreachable".to_string()))
    }
}

/// 指定ストレージでテスト用GatewayStateを構築する
pub fn state_with_store(storage: Box<dyn ImageStore>) -> GatewayState {
    GatewayState {
        api_key: ApiKey::new(TEST_API_KEY),
        storage,
        max_upload_size: TEST_MAX_UPLOAD_SIZE,
    }
}

/// メモリストレージを持つテスト用GatewayState
pub fn test_state() -> Arc<GatewayState> {
    Arc::new(state_with_store(Box::new(MemoryStore::default())))
}

/// ルーターをエフェメラルポートで起動し、ベースURLを返す。
pub async fn spawn_app(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}
