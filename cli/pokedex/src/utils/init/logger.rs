use std::sync::OnceLock;

use tracing::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber, or update its filter if already installed.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (subscriber, reload_handle) = create_registry_and_filter_reload_handle();
        subscriber.init();
        reload_handle
    });

    update_filters(filter_handle, log_filter(verbosity));
}

fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,pokedex=error,pokedex_catalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,pokedex=warn,pokedex_catalog=warn",
        // Show our own info logs
        Verbosity::Verbose(1) => "off,pokedex=info,pokedex_catalog=info",
        // Also show debug from our libraries
        Verbosity::Verbose(2) => "off,pokedex=debug,pokedex_catalog=debug",
        // Also show trace from our libraries
        Verbosity::Verbose(3) => "off,pokedex=trace,pokedex_catalog=trace",
        // Include the http stack
        Verbosity::Verbose(4) => "debug,pokedex=trace,pokedex_catalog=trace",
        Verbosity::Verbose(_) => "trace",
    }
}

fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

fn create_registry_and_filter_reload_handle() -> (
    impl tracing_subscriber::util::SubscriberInitExt,
    Handle<EnvFilter, Registry>,
) {
    debug!("Initializing logger (how are you seeing this?)");
    // Start wide open, the actual filter is set right after by `update_filters`.
    let filter = EnvFilter::new("trace");
    let (filter, filter_reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(tracing_subscriber::fmt::format());
    let registry = tracing_subscriber::registry().with(filter).with(log_layer);

    (registry, filter_reload_handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verbosity_has_a_valid_filter() {
        let levels = [Verbosity::Quiet]
            .into_iter()
            .chain((0..=5).map(Verbosity::Verbose));
        for verbosity in levels {
            assert!(
                EnvFilter::try_new(log_filter(verbosity)).is_ok(),
                "{verbosity:?}"
            );
        }
    }
}
