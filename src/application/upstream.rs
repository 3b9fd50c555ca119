use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::application::error::{ResolveError, Upstream};
use crate::application::repos::RepoError;

const SOURCE: &str = "application::upstream";

/// Runs a repository call under `limit`, mapping failures to `ResolveError::Upstream`.
pub(crate) async fn database<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, ResolveError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(target = SOURCE, operation, error = %err, "database call failed");
            Err(err.into())
        }
        Err(_) => {
            let timeout_ms = limit.as_millis() as u64;
            warn!(target = SOURCE, operation, timeout_ms, "database call timed out");
            Err(ResolveError::upstream(
                Upstream::Database,
                format!("{operation} timed out after {timeout_ms}ms"),
            ))
        }
    }
}
