//! tcp-blast: a point-to-point TCP throughput benchmark
//!
//! Two programs share this library:
//! - `tcp-blast-sender` accepts a single connection and writes a constant
//!   buffer to it a fixed number of times
//! - `tcp-blast-receiver` connects, reads until the expected byte count has
//!   arrived and prints the measured throughput
//!
//! Both are single-threaded and use blocking sockets. Configuration comes
//! from CLI arguments or a TOML file; the defaults reproduce a 10 KiB x
//! 1,000,000 transfer over `127.0.0.1:6666`.

pub mod config;
pub mod receiver;
pub mod report;
pub mod sender;

pub use config::{Config, ConfigError};
pub use report::{Measurement, Report};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level`. Logs go to stderr so that stdout only ever
/// carries the receiver's result line.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
