//! Throughput arithmetic and the receiver's result line.

use std::fmt;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Throughput in MB/s for `total` bytes moved in `cost_ms` milliseconds.
///
/// MB here is 2^20 bytes. A zero cost yields infinity.
pub fn throughput_mb_per_sec(total: u64, cost_ms: f64) -> f64 {
    (total as f64 / BYTES_PER_MB) / (cost_ms / 1000.0)
}

/// Outcome of a completed receive loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Sum of the byte counts returned by every read call
    pub total: u64,
    /// Number of read calls that returned data
    pub reads: u64,
    /// Wall-clock time from the first read to reaching the goal
    pub elapsed: Duration,
}

impl Measurement {
    /// Elapsed time in (fractional) milliseconds
    pub fn cost_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Throughput in MB/s
    pub fn speed(&self) -> f64 {
        throughput_mb_per_sec(self.total, self.cost_ms())
    }

    /// Average number of bytes a read call returned
    pub fn mean_read_size(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.total as f64 / self.reads as f64
        }
    }

    pub fn report(&self) -> Report {
        Report {
            total: self.total,
            speed: self.speed(),
        }
    }
}

/// The single line the receiver prints on stdout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub total: u64,
    pub speed: f64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Read {} bytes, speed: {} MB/s", self.total, self.speed)
    }
}
