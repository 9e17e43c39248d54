mod shared;
mod workspace;

pub use shared::SharedDatabase;
pub use workspace::TestWorkspace;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
