use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Run a side call whose failure must never reach the caller
///
/// Reactions and error notices go through here: the failure is logged
/// with `what` as context and reported back as `false`.
pub async fn best_effort<F, T, E>(what: &str, call: F) -> bool
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match call.await {
        Ok(_) => true,
        Err(e) => {
            warn!("{} failed: {}", what, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        assert!(best_effort("ok call", async { Ok::<_, String>(1) }).await);
        assert!(!best_effort("bad call", async { Err::<(), _>("boom".to_string()) }).await);
    }
}
