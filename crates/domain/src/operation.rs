use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::DomainError;

/// Runs one service operation under `timeout`.
///
/// On expiry the operation future is dropped, which drops its open
/// transaction and rolls it back.
pub(crate) async fn run<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    let started = Instant::now();

    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("operation_timeouts_total", "operation" => operation).increment(1);
            tracing::warn!(operation, ?timeout, "operation timed out, transaction rolled back");
            Err(DomainError::Timeout {
                operation,
                after: timeout,
            })
        }
    };

    metrics::histogram!("order_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    result
}
