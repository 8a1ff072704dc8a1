mod card_system_tests;
mod embedder_tests;
mod numeric_tests;

/// Route trace output through the test harness when `RUST_LOG` is set.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
