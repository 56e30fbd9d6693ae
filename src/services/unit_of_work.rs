//! Runs a unit of work inside a single database transaction.
//!
//! The closure receives the open transaction; returning `Err` (or failing to
//! commit) rolls everything back, so no partial writes are ever visible.

use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};

pub async fn atomically<F, T, E>(db: &DatabaseConnection, work: F) -> Result<T, E>
where
    F: for<'c> FnOnce(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
        + Send,
    T: Send,
    E: std::error::Error + From<DbErr> + Send,
{
    db.transaction(work).await.map_err(|err| match err {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
