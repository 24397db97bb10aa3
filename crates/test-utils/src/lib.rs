pub mod builders;
pub mod fixtures;

use std::sync::Once;

use manuallabour::logging::{LOG_ENV_VAR, effective_level};
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Install a subscriber that writes through the test harness.
///
/// Output is only shown for failing tests. The level follows
/// `MANUALLABOUR_LOG` and defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let level = effective_level(None, std::env::var(LOG_ENV_VAR).ok().as_deref());
        let _ = fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
