//! Receiver: connect to the sender and time how long it takes to read the goal.
//!
//! Each loop iteration issues a single read into a fixed buffer and counts
//! whatever the call returned; short reads are not topped up. The loop ends
//! once the running total reaches or passes the goal.

use socket2::SockRef;
use std::io::{self, ErrorKind, Read};
use std::net::TcpStream;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::report::Measurement;

/// Running byte count against a fixed goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    total: u64,
    reads: u64,
    goal: u64,
}

impl Progress {
    pub fn new(goal: u64) -> Self {
        Self {
            total: 0,
            reads: 0,
            goal,
        }
    }

    /// Account for one read call that returned `n` bytes.
    pub fn record(&mut self, n: usize) {
        self.total += n as u64;
        self.reads += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.total >= self.goal
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn goal(&self) -> u64 {
        self.goal
    }
}

/// Connect to the sender and apply the optional socket tuning.
pub fn connect(config: &Config) -> io::Result<TcpStream> {
    let addr = config.socket_addr()?;
    let stream = TcpStream::connect(addr)?;

    let socket = SockRef::from(&stream);
    if let Some(size) = config.recv_buffer {
        socket.set_recv_buffer_size(size)?;
        debug!(
            requested = size,
            actual = socket.recv_buffer_size()?,
            "Set receive buffer size"
        );
    }
    if config.nodelay {
        socket.set_nodelay(true)?;
    }

    info!(peer = %addr, local = %stream.local_addr()?, "Connected to sender");
    Ok(stream)
}

/// Read from `input` until `goal` bytes have arrived.
///
/// The clock starts just before the first read. A read returning zero bytes
/// before the goal is reached means the sender went away and is reported as
/// `UnexpectedEof`; interrupted reads are retried.
pub fn receive<R: Read>(input: &mut R, buffer_size: usize, goal: u64) -> io::Result<Measurement> {
    let mut buffer = vec![0u8; buffer_size];
    let mut progress = Progress::new(goal);
    let start = Instant::now();

    while !progress.is_complete() {
        let n = match input.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "stream closed after {} of {} bytes",
                    progress.total(),
                    progress.goal()
                ),
            ));
        }
        progress.record(n);
    }

    Ok(Measurement {
        total: progress.total(),
        reads: progress.reads(),
        elapsed: start.elapsed(),
    })
}

/// Run the receiver end to end: connect, read up to the goal, measure.
pub fn run(config: &Config) -> io::Result<Measurement> {
    let mut stream = connect(config)?;
    let goal = config.goal();
    info!(goal, buffer_size = config.buffer_size, "Receiving");

    let measurement = receive(&mut stream, config.buffer_size, goal)?;
    info!(
        bytes = measurement.total,
        reads = measurement.reads,
        mean_read_size = measurement.mean_read_size(),
        elapsed = ?measurement.elapsed,
        "Receive complete"
    );

    Ok(measurement)
}
