//! tcp-blast-receiver: read the expected byte count from a sender and
//! report the throughput.

use tcp_blast::{init_logging, receiver, Config};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config.log_level);

    info!(
        host = %config.host,
        port = config.port,
        goal = config.goal(),
        "Starting tcp-blast receiver"
    );

    let measurement = receiver::run(&config)?;
    println!("{}", measurement.report());
    Ok(())
}
