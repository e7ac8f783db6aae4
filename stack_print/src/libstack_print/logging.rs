use env_logger::{Builder, Env, Target};

/// Diagnostics go to stderr so stdout only ever carries the trace.
/// The filter comes from `RUST_LOG`, `warn` when unset.
pub fn init() {
    init_with_default("warn");
}

fn init_with_default(filter: &str) {
    // a second init, e.g. from several tests, keeps the first logger
    let _ = Builder::from_env(Env::default().default_filter_or(filter))
        .target(Target::Stderr)
        .format_timestamp(None)
        .try_init();
}
