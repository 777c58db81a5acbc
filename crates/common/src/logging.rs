use std::io;

use tracing_core::Level;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Logging;

/// Install the global subscriber.
///
/// Log events are written to stderr, so that tables and status lines
/// printed to stdout stay machine-readable.
pub fn init(logging: &Logging) {
    let fmt = fmt::format().with_target(false).compact();

    let target_filters = Targets::new()
        .with_target("hyper", Level::WARN)
        .with_target("reqwest", Level::WARN)
        .with_default(logging.level);

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(fmt).with_writer(io::stderr))
        .with(target_filters)
        .init();
}
