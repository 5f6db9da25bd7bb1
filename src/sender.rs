//! Bulk sender: accept one peer, then write the same buffer to it over and over.
//!
//! The listening socket is closed as soon as a peer has been accepted, so the
//! sender serves exactly one receiver per run. Write failures (peer gone,
//! broken pipe, reset) end the run with an error; nothing is retried.

use bytes::Bytes;
use socket2::SockRef;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;

/// The fixed block written on every iteration.
///
/// Filled once at construction and never mutated; clones share the storage.
#[derive(Debug, Clone)]
pub struct TransferBuffer {
    data: Bytes,
}

impl TransferBuffer {
    /// Create a buffer of `size` bytes, every byte set to `fill`.
    pub fn new(size: usize, fill: u8) -> Self {
        Self {
            data: Bytes::from(vec![fill; size]),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A bound listener waiting for its single peer.
pub struct Sender {
    listener: TcpListener,
}

impl Sender {
    /// Bind and listen on the configured address.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr = config.socket_addr()?;
        let listener = create_listener(addr)?;
        info!(address = %listener.local_addr()?, "Sender listening");
        Ok(Self { listener })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Block until one peer connects.
    ///
    /// Consumes the sender: the listening socket is dropped before this
    /// returns, so later connection attempts are refused.
    pub fn accept(self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept()?;
        drop(self.listener);
        info!(peer = %peer, "Receiver connected, listener closed");
        Ok((stream, peer))
    }
}

/// Create a blocking listener with a backlog of one.
fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;

    Ok(socket.into())
}

/// Apply the optional socket tuning to an accepted connection.
fn configure_stream(stream: &TcpStream, config: &Config) -> io::Result<()> {
    let socket = SockRef::from(stream);
    if let Some(size) = config.send_buffer {
        socket.set_send_buffer_size(size)?;
        debug!(
            requested = size,
            actual = socket.send_buffer_size()?,
            "Set send buffer size"
        );
    }
    if config.nodelay {
        socket.set_nodelay(true)?;
    }
    Ok(())
}

/// Write `buffer` to `out` `iterations` times.
///
/// Each iteration is a full write of the buffer. Returns the number of bytes
/// written; the first failing write aborts the loop.
pub fn send<W: Write>(out: &mut W, buffer: &TransferBuffer, iterations: u64) -> io::Result<u64> {
    let chunk = buffer.as_slice();
    let mut sent: u64 = 0;

    for _ in 0..iterations {
        out.write_all(chunk)?;
        sent += chunk.len() as u64;
    }

    out.flush()?;
    Ok(sent)
}

/// Run the sender end to end: bind, accept one peer, send, return bytes sent.
pub fn run(config: &Config) -> io::Result<u64> {
    serve(Sender::bind(config)?, config)
}

/// Accept the single peer on an already bound sender and stream to it.
pub fn serve(sender: Sender, config: &Config) -> io::Result<u64> {
    let (mut stream, peer) = sender.accept()?;
    configure_stream(&stream, config)?;

    let buffer = TransferBuffer::new(config.buffer_size, config.fill_byte);
    info!(
        peer = %peer,
        buffer_size = buffer.len(),
        iterations = config.iterations,
        fill_byte = config.fill_byte,
        "Sending"
    );

    let start = Instant::now();
    let sent = send(&mut stream, &buffer, config.iterations)?;
    info!(bytes = sent, elapsed = ?start.elapsed(), "Send complete");

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;

    fn test_config(iterations: u64, buffer_size: usize) -> Config {
        Config {
            port: 0,
            iterations,
            buffer_size,
            ..Config::default()
        }
    }

    /// Writer that accepts `limit` writes and then fails like a closed pipe.
    struct FailingWriter {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.limit -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_transfer_buffer_fill() {
        let buffer = TransferBuffer::new(10 * 1024, 12);
        assert_eq!(buffer.len(), 10240);
        assert!(buffer.as_slice().iter().all(|&b| b == 12));
    }

    #[test]
    fn test_send_writes_every_iteration() {
        let buffer = TransferBuffer::new(16, 12);
        let mut out = Vec::new();

        let sent = send(&mut out, &buffer, 3).unwrap();
        assert_eq!(sent, 48);
        assert_eq!(out.len(), 48);
        assert!(out.iter().all(|&b| b == 12));
    }

    #[test]
    fn test_send_zero_iterations() {
        let buffer = TransferBuffer::new(16, 12);
        let mut out = Vec::new();
        assert_eq!(send(&mut out, &buffer, 0).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_send_write_failure_is_fatal() {
        let buffer = TransferBuffer::new(8, 1);
        let mut out = FailingWriter {
            written: Vec::new(),
            limit: 2,
        };

        let err = send(&mut out, &buffer, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(out.written.len(), 16);
    }

    #[test]
    fn test_wire_bytes_are_fill_constant() {
        let config = test_config(50, 1000);
        let sender = Sender::bind(&config).unwrap();
        let addr = sender.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = sender.accept().unwrap();
            let buffer = TransferBuffer::new(config.buffer_size, config.fill_byte);
            send(&mut stream, &buffer, config.iterations).unwrap()
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let mut captured = Vec::new();
        client.read_to_end(&mut captured).unwrap();

        assert_eq!(handle.join().unwrap(), 50_000);
        assert_eq!(captured.len(), 50_000);
        assert!(captured.iter().all(|&b| b == 12));
    }

    #[test]
    fn test_second_connection_refused() {
        let config = test_config(1, 16);
        let sender = Sender::bind(&config).unwrap();
        let addr = sender.local_addr().unwrap();

        let handle = thread::spawn(move || sender.accept().unwrap());

        let _first = TcpStream::connect(addr).unwrap();
        let (_accepted, _) = handle.join().unwrap();

        let err = TcpStream::connect(addr).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_serve_fails_when_receiver_disconnects() {
        let config = Config {
            nodelay: true,
            send_buffer: Some(64 * 1024),
            ..test_config(u64::MAX / 1024, 1024)
        };
        let sender = Sender::bind(&config).unwrap();
        let addr = sender.local_addr().unwrap();

        let handle = thread::spawn(move || serve(sender, &config));

        let mut client = TcpStream::connect(addr).unwrap();
        let mut chunk = [0u8; 4096];
        client.read_exact(&mut chunk).unwrap();
        drop(client);

        assert!(handle.join().unwrap().is_err());
    }
}
