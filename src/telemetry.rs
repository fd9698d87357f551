use std::sync::OnceLock;

static TELEMETRY: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// Safe to call from multiple entry points (server, probe, demos, tests);
/// only the first call installs anything.
pub fn init() {
    TELEMETRY.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
}
