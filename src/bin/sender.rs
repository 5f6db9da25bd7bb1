//! tcp-blast-sender: accept one receiver and stream a constant buffer to it.

use tcp_blast::{init_logging, sender, Config};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config.log_level);

    info!(
        host = %config.host,
        port = config.port,
        buffer_size = config.buffer_size,
        iterations = config.iterations,
        "Starting tcp-blast sender"
    );

    sender::run(&config)?;
    Ok(())
}
