use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

pub fn init_tracing_subscriber(logs_dir: Option<&Path>, filename: &str) {
    // base for the subscriber, stdout is reserved for results
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    if let Some(logs_dir) = logs_dir {
        let filename = format!("{}.log", filename);
        let file_appender = RollingFileAppender::new(Rotation::NEVER, logs_dir, filename);
        let subscriber = subscriber
            .with_ansi(true)
            .with_file(false)
            .with_target(false)
            .finish();

        // log file as an additional layer
        let file_layer = layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .with_file(false)
            .with_target(false)
            .with_writer(file_appender);

        if tracing::subscriber::set_global_default(subscriber.with(file_layer)).is_err() {
            eprintln!("Unable to set global subscriber with 2 layers");
        }
    } else {
        let subscriber = subscriber
            .with_ansi(true)
            .with_file(false)
            .with_target(false)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("Unable to set global subscriber");
        }
    }
}
