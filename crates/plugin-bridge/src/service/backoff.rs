//! Fixed-interval re-check waiting.
//!
//! Each check runs, then the task sleeps for `interval`, yielding to the
//! runtime so inbound traffic can make progress toward the awaited condition.

use crate::error::{BridgeError, BridgeResult};
use std::time::Duration;

/// Re-run `check` every `interval` until it yields a value.
///
/// With `deadline = None` this waits forever. Otherwise it fails with
/// `BridgeError::Timeout` naming `what`.
pub(crate) async fn poll_until<T, F>(
    mut check: F,
    interval: Duration,
    deadline: Option<Duration>,
    what: &'static str,
) -> BridgeResult<T>
where
    F: FnMut() -> Option<T>,
{
    let waiting = async {
        loop {
            if let Some(value) = check() {
                return value;
            }
            tokio::time::sleep(interval).await;
        }
    };

    match deadline {
        None => Ok(waiting.await),
        Some(limit) => tokio::time::timeout(limit, waiting)
            .await
            .map_err(|_| BridgeError::Timeout {
                what,
                waited: limit,
            }),
    }
}
