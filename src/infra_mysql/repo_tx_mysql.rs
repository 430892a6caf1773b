use crate::domain_port::{StorageTx, TxManager};
use crate::logger::*;
use anyhow::Context;
use sqlx::{MySql, MySqlConnection, MySqlPool, Transaction};

/// Hands out pooled MySQL transactions. Row locks taken with
/// `SELECT ... FOR UPDATE` are held until `commit` or `rollback`; a handle
/// dropped without either is rolled back by sqlx.
pub struct MySqlTxManager {
    pool: MySqlPool,
}

impl MySqlTxManager {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTxManager { pool }
    }
}

#[async_trait::async_trait]
impl TxManager for MySqlTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let tx = self.pool.begin().await.context("begin transaction")?;
        Ok(Box::new(MySqlTx { inner: tx }))
    }
}

pub struct MySqlTx<'t> {
    inner: Transaction<'t, MySql>,
}

impl MySqlTx<'_> {
    pub fn conn(&mut self) -> &mut MySqlConnection {
        self.inner.as_mut()
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MySqlTx<'t> {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.inner.commit().await.context("commit transaction")
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        debug!("rolling back transaction");
        self.inner.rollback().await.context("rollback transaction")
    }
}
