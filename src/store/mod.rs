use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::config::settings::{StorageConfig, StorageKind};

pub mod kv;
pub mod token_store;

pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use token_store::TokenStore;

/// Build the token store backend selected in config.
pub fn build_token_store(cfg: &StorageConfig) -> Result<TokenStore> {
    let kv: Arc<dyn KeyValueStore> = match cfg.kind {
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::File => {
            let path = cfg
                .path
                .as_ref()
                .ok_or_else(|| anyhow!("storage kind 'file' requires 'path'"))?;
            info!("session storage: file '{}'", path);
            Arc::new(FileStore::new(path))
        }
    };
    Ok(TokenStore::new(kv, &cfg.namespace))
}
