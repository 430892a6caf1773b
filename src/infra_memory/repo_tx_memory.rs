use crate::domain_port::{StorageTx, TxManager};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes transactions with one store-wide lock. There is no undo log:
/// writes made inside a transaction stay even if it is rolled back.
#[derive(Default)]
pub struct MemoryTxManager {
    lock: Arc<Mutex<()>>,
}

impl MemoryTxManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let guard = self.lock.clone().lock_owned().await;
        Ok(Box::new(MemoryTx { _guard: guard }))
    }
}

pub struct MemoryTx {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemoryTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn rollback_releases_the_lock() {
        let manager = MemoryTxManager::new();

        let tx = manager.begin().await.unwrap();
        tx.rollback().await.unwrap();

        let tx = tokio::time::timeout(Duration::from_secs(5), manager.begin())
            .await
            .expect("lock still held")
            .unwrap();
        tx.commit().await.unwrap();
    }
}
