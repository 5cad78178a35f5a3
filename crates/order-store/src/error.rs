use thiserror::Error;

/// Errors that can occur when interacting with the order store.
///
/// Every variant carries the repository operation that produced it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Store operation '{op}' failed: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The operation lost against a concurrent transaction (serialization
    /// failure, deadlock, lock timeout or uniqueness race).
    #[error("Store operation '{op}' conflicted with a concurrent transaction")]
    Conflict { op: &'static str },

    /// A stored row could not be mapped back into a record.
    #[error("Store operation '{op}' read an invalid row: {reason}")]
    Corrupt { op: &'static str, reason: String },

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns a mapper that tags a raw `sqlx` error with `op`.
    ///
    /// SQLSTATE codes that signal a lost race are reported as
    /// [`StoreError::Conflict`].
    pub fn query(op: &'static str) -> impl Fn(sqlx::Error) -> StoreError + Copy {
        move |source| {
            if let sqlx::Error::Database(ref db_err) = source
                && matches!(
                    db_err.code().as_deref(),
                    Some("40001" | "40P01" | "55P03" | "23505")
                )
            {
                return StoreError::Conflict { op };
            }
            StoreError::Query { op, source }
        }
    }

    /// Creates a [`StoreError::Corrupt`] error.
    pub fn corrupt(op: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            op,
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    ///
    /// Only lost races and a lost or exhausted connection qualify. Decode
    /// failures, missing rows and constraint violations are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict { .. } => true,
            StoreError::Query { source, .. } => match source {
                sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::Protocol(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed => true,
                // Class 08: connection exception. 57P01: admin shutdown.
                sqlx::Error::Database(db_err) => db_err
                    .code()
                    .is_some_and(|code| code.starts_with("08") || code == "57P01"),
                _ => false,
            },
            StoreError::Corrupt { .. } | StoreError::Migration(_) => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
