//! Tracing setup. No exporter, no metrics backend — this crate only
//! installs the `tracing-subscriber` `EnvFilter` layer the rest of
//! this lineage's services use, reading `RUST_LOG` with a sane
//! default when unset.

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pck_api=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
