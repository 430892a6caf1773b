use super::repo_tx_mysql::MySqlTx;
use crate::domain_model::UniqueField;
use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;

/// Recover the concrete MySQL transaction behind a `StorageTx`.
/// Only valid for handles opened by `MySqlTxManager`.
pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> &'a mut MySqlTx<'t> {
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MySqlTx<'t>;
        &mut *p
    }
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// Which unique key a duplicate-entry error hit. The message names the key,
/// e.g. `Duplicate entry '...' for key 'users.uk_users_phone'`.
pub fn dup_field(err: &sqlx::Error) -> Option<UniqueField> {
    if !is_dup_key(err) {
        return None;
    }
    match err {
        sqlx::Error::Database(db) if db.message().contains("uk_users_phone") => {
            Some(UniqueField::Phone)
        }
        _ => Some(UniqueField::Email),
    }
}

pub fn store_err(err: sqlx::Error) -> RepoError {
    match dup_field(&err) {
        Some(field) => RepoError::Duplicate(field),
        None => RepoError::Store(err.to_string()),
    }
}
