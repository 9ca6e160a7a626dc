//! Retrying send/receive over non-blocking stream sockets.
//!
//! Both directions move the *exact* number of bytes a frame needs before
//! reporting success; partial frames never leave this module. `WouldBlock`
//! sleeps for [`IO_RECOVERY_INTERVAL`] and retries, `Interrupted` retries
//! immediately, and every other error aborts the transfer. The `cancel`
//! flag is checked before each attempt, so a raised flag stops a stalled
//! transfer within one recovery interval. A cancelled transfer may leave a
//! partial frame on the wire, so `cancel` is meant for abandoning the
//! connection. [`recv_message_at_boundary`] adds a softer `stop` flag that
//! never splits a frame.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::framing::{decode_header, encode_frame};
use super::{is_recoverable, WireError};
use crate::constants::{FRAME_HEADER_LEN, IO_RECOVERY_INTERVAL};

/// Send one message as a single frame.
///
/// Works with any writer; pass `&TcpStream` to share a socket between the
/// threads of one session.
///
/// # Errors
///
/// Fails on cancellation, on an empty or oversized message and on any
/// unrecoverable I/O error.
pub fn send_message<W: Write>(
    mut writer: W,
    message: &str,
    cancel: &AtomicBool,
) -> Result<(), WireError> {
    let frame = encode_frame(message.as_bytes())?;
    write_fully(&mut writer, &frame, cancel)
}

/// Receive one frame and decode it as text.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
///
/// # Errors
///
/// Fails with [`WireError::Empty`] on a zero length prefix,
/// [`WireError::Closed`] on EOF, [`WireError::Cancelled`] when `cancel` is
/// raised and [`WireError::Io`] on unrecoverable socket errors.
pub fn recv_message<R: Read>(reader: R, cancel: &AtomicBool) -> Result<String, WireError> {
    recv_frame(reader, None, cancel)
}

/// Receive one frame unless `stop` is raised before it starts.
///
/// `stop` is only honored while no byte of the next frame has arrived.
/// Once the header has started, the frame is read to the end and only
/// `cancel` can interrupt it.
///
/// # Errors
///
/// As [`recv_message`], with [`WireError::Cancelled`] also returned for a
/// raised `stop`.
pub fn recv_message_at_boundary<R: Read>(
    reader: R,
    stop: &AtomicBool,
    cancel: &AtomicBool,
) -> Result<String, WireError> {
    recv_frame(reader, Some(stop), cancel)
}

fn recv_frame<R: Read>(
    mut reader: R,
    stop: Option<&AtomicBool>,
    cancel: &AtomicBool,
) -> Result<String, WireError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    read_fully(&mut reader, &mut header, stop, cancel)?;
    let length = decode_header(header)?;

    let mut body = vec![0u8; length];
    read_fully(&mut reader, &mut body, None, cancel)?;

    Ok(String::from_utf8(body)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

/// Write all of `buf`, retrying on `WouldBlock`.
fn write_fully<W: Write>(
    writer: &mut W,
    mut buf: &[u8],
    cancel: &AtomicBool,
) -> Result<(), WireError> {
    while !buf.is_empty() {
        if cancel.load(Ordering::Relaxed) {
            return Err(WireError::Cancelled);
        }
        match writer.write(buf) {
            Ok(0) => return Err(WireError::Io(io::ErrorKind::WriteZero.into())),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if is_recoverable(&e) => thread::sleep(IO_RECOVERY_INTERVAL),
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

/// Fill all of `buf`, retrying on `WouldBlock`. `stop` counts only while
/// nothing has been read.
fn read_fully<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    stop: Option<&AtomicBool>,
    cancel: &AtomicBool,
) -> Result<(), WireError> {
    let mut filled = 0;
    while filled < buf.len() {
        let stopped = filled == 0 && stop.is_some_and(|flag| flag.load(Ordering::Relaxed));
        if stopped || cancel.load(Ordering::Relaxed) {
            return Err(WireError::Cancelled);
        }
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(WireError::Closed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if is_recoverable(&e) => thread::sleep(IO_RECOVERY_INTERVAL),
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::time::Duration;

    /// Transport that moves at most `chunk` bytes per call and reports
    /// `WouldBlock` on every `stall_every`-th call.
    struct ChunkedPipe {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        chunk: usize,
        stall_every: usize,
        calls: usize,
    }

    impl ChunkedPipe {
        fn new(inbound: &[u8], chunk: usize, stall_every: usize) -> Self {
            Self {
                inbound: inbound.iter().copied().collect(),
                outbound: Vec::new(),
                chunk,
                stall_every,
                calls: 0,
            }
        }

        fn stall(&mut self) -> bool {
            self.calls += 1;
            self.calls % self.stall_every == 0
        }
    }

    impl Read for ChunkedPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.stall() {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk).min(self.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for ChunkedPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.stall() {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk);
            self.outbound.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer that fails with a hard error.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_single_byte_chunks_with_stalls_round_trip() {
        let cancel = AtomicBool::new(false);
        let mut pipe = ChunkedPipe::new(&[], 1, 4);
        send_message(&mut pipe, "[amy] hi", &cancel).unwrap();
        assert_eq!(&pipe.outbound[..4], &[0, 0, 0, 8]);

        let mut reader = ChunkedPipe::new(&pipe.outbound, 1, 4);
        assert_eq!(recv_message(&mut reader, &cancel).unwrap(), "[amy] hi");
    }

    #[test]
    fn test_small_chunks_deliver_consecutive_messages() {
        let cancel = AtomicBool::new(false);
        let mut pipe = ChunkedPipe::new(&[], 3, 5);
        for msg in ["amy", "$", "<$>"] {
            send_message(&mut pipe, msg, &cancel).unwrap();
        }

        let mut reader = ChunkedPipe::new(&pipe.outbound, 2, 3);
        assert_eq!(recv_message(&mut reader, &cancel).unwrap(), "amy");
        assert_eq!(recv_message(&mut reader, &cancel).unwrap(), "$");
        assert_eq!(recv_message(&mut reader, &cancel).unwrap(), "<$>");
    }

    #[test]
    fn test_zero_prefix_is_no_message() {
        let cancel = AtomicBool::new(false);
        let mut reader = ChunkedPipe::new(&[0, 0, 0, 0], 4, usize::MAX);
        assert!(matches!(recv_message(&mut reader, &cancel), Err(WireError::Empty)));
    }

    #[test]
    fn test_eof_mid_frame_is_closed() {
        let cancel = AtomicBool::new(false);
        let mut reader = ChunkedPipe::new(&[0, 0, 0, 5, b'h', b'i'], 8, usize::MAX);
        assert!(matches!(recv_message(&mut reader, &cancel), Err(WireError::Closed)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = AtomicBool::new(true);
        let mut pipe = ChunkedPipe::new(&[0, 0, 0, 1, b'x'], 8, usize::MAX);
        assert!(matches!(send_message(&mut pipe, "x", &cancel), Err(WireError::Cancelled)));
        assert!(pipe.outbound.is_empty());
        assert!(matches!(recv_message(&mut pipe, &cancel), Err(WireError::Cancelled)));
    }

    #[test]
    fn test_stop_before_header_cancels() {
        let stop = AtomicBool::new(true);
        let cancel = AtomicBool::new(false);
        let mut pipe = ChunkedPipe::new(&[0, 0, 0, 1, b'x'], 8, usize::MAX);
        assert!(matches!(
            recv_message_at_boundary(&mut pipe, &stop, &cancel),
            Err(WireError::Cancelled)
        ));
        assert_eq!(pipe.inbound.len(), 5);
    }

    #[test]
    fn test_stop_after_header_started_finishes_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut writer = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (reader, _) = listener.accept().unwrap();
        reader.set_nonblocking(true).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let cancel = AtomicBool::new(false);
        writer.write_all(&[0, 0, 0, 5, b'h', b'e']).unwrap();

        let flag = Arc::clone(&stop);
        let late = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(200));
            writer.write_all(b"llo").unwrap();
            writer.write_all(&[0, 0, 0, 1, b'$']).unwrap();
            writer
        });

        assert_eq!(recv_message_at_boundary(&reader, &stop, &cancel).unwrap(), "hello");
        let _writer = late.join().unwrap();
        // Next frame boundary: the raised flag applies again.
        assert!(matches!(
            recv_message_at_boundary(&reader, &stop, &cancel),
            Err(WireError::Cancelled)
        ));
        assert_eq!(recv_message(&reader, &cancel).unwrap(), "$");
    }

    #[test]
    fn test_hard_error_aborts_send() {
        let cancel = AtomicBool::new(false);
        let result = send_message(BrokenPipe, "hello", &cancel);
        assert!(matches!(result, Err(WireError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_empty_message_not_sent() {
        let cancel = AtomicBool::new(false);
        let mut pipe = ChunkedPipe::new(&[], 8, usize::MAX);
        assert!(matches!(send_message(&mut pipe, "", &cancel), Err(WireError::Empty)));
        assert!(pipe.outbound.is_empty());
    }

    #[test]
    fn test_nonblocking_tcp_round_trip_and_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        client.set_nonblocking(true).unwrap();
        server.set_nonblocking(true).unwrap();

        let cancel = Arc::new(AtomicBool::new(false));
        send_message(&client, "hello over tcp", &cancel).unwrap();
        assert_eq!(recv_message(&server, &cancel).unwrap(), "hello over tcp");

        // Nothing in flight: the receiver keeps retrying until cancelled.
        let flag = Arc::clone(&cancel);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            flag.store(true, Ordering::Relaxed);
        });
        assert!(matches!(recv_message(&server, &cancel), Err(WireError::Cancelled)));
        canceller.join().unwrap();
    }

    #[test]
    fn test_peer_close_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        drop(client);

        let cancel = AtomicBool::new(false);
        assert!(matches!(recv_message(&server, &cancel), Err(WireError::Closed)));
    }
}
