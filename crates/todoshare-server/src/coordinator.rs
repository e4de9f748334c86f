//! One transaction per request.
//!
//! A [`RequestScope`] owns the transaction from `begin` until authorization.
//! Authorizing consumes it: a denial or lookup failure rolls back and returns
//! the error, an allow yields an [`Authorized`] scope, which is the only way to
//! reach the transaction for the operation itself. `finish` commits on `Ok`
//! and rolls back on `Err`. If the request future is dropped mid-way
//! (client gone, timeout, panic) the transaction is dropped and rolled back.

use todoshare_core::authz::{self, Decision, ResourceRef, Scope};
use todoshare_core::claims::Claims;
use todoshare_core::role::Role;
use todoshare_storage::{Database, Transaction};

use crate::adapter::TxAccessSource;
use crate::audit;
use crate::error::ApiError;

pub struct RequestScope<T: Transaction> {
    tx: T,
    operation: &'static str,
}

impl<T: Transaction> RequestScope<T> {
    pub async fn begin<D>(db: &D, operation: &'static str) -> Result<Self, ApiError>
    where
        D: Database<Tx = T>,
    {
        let tx = db.begin().await?;
        Ok(Self { tx, operation })
    }

    pub async fn authorize(
        mut self,
        claims: &Claims,
        resource: &ResourceRef,
        required: Role,
        scope: Scope,
    ) -> Result<Authorized<T>, ApiError> {
        let mut source = TxAccessSource::new(&mut self.tx);
        let outcome = authz::authorize(&mut source, claims, resource, &required, scope).await;

        match outcome {
            Ok(Decision::Allow) => Ok(Authorized {
                tx: self.tx,
                operation: self.operation,
            }),
            Ok(Decision::Deny(reason)) => {
                rollback(self.tx, self.operation).await;
                audit::audit_denied(self.operation, &claims.user_id, reason);
                Err(ApiError::Denied(reason))
            }
            Err(e) => {
                tracing::error!(operation = self.operation, error = %e, "authorization lookup failed");
                rollback(self.tx, self.operation).await;
                Err(e.into())
            }
        }
    }
}

pub struct Authorized<T: Transaction> {
    tx: T,
    operation: &'static str,
}

impl<T: Transaction> Authorized<T> {
    pub fn tx(&mut self) -> &mut T {
        &mut self.tx
    }

    pub async fn finish<R>(self, result: Result<R, ApiError>) -> Result<R, ApiError> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                tracing::debug!(operation = self.operation, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                rollback(self.tx, self.operation).await;
                Err(e)
            }
        }
    }
}

async fn rollback<T: Transaction>(tx: T, operation: &'static str) {
    match tx.rollback().await {
        Ok(()) => tracing::debug!(operation, "transaction rolled back"),
        Err(e) => tracing::warn!(operation, error = %e, "rollback failed"),
    }
}
