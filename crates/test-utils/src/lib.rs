//! Shared helpers for the `sitepipe` integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use sitepipe::logging;
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Upper bound for any single test future.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test subscriber once per process.
///
/// Reads `SITEPIPE_LOG` like the binary does, but defaults to `warn` so
/// passing runs stay quiet. Output is captured per test and only shown for
/// failures (or with `-- --nocapture`):
///
/// `SITEPIPE_LOG=sitepipe=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(logging::env_filter(None, "warn"))
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    within(TEST_TIMEOUT, f).await
}

/// Await `f`, failing the test after `limit`.
pub async fn within<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {limit:?}"))
}
