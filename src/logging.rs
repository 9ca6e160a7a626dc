//! Batched log sink.
//!
//! `env_logger` formats records into a [`BatchedLogWriter`], which only
//! queues complete lines, so logging never blocks a session thread on I/O. A
//! [`LogWorker`] thread writes at most [`LOG_BATCH_SIZE`] lines every
//! [`LOG_FLUSH_INTERVAL`] and drains the queue completely before it exits.
//!
//! ```text
//! log::info!() ──► env_logger ──► BatchedLogWriter ──► queue
//!                                                        │
//!                          LogWorker (own thread) ◄──────┘──► sink
//! ```

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::constants::{LOG_BATCH_SIZE, LOG_FLUSH_INTERVAL};
use crate::storage::SharedDeque;

/// Pending log lines, oldest first.
pub type LogQueue = SharedDeque<String>;

/// `Write` adapter that turns byte writes into queued lines.
#[derive(Debug)]
pub struct BatchedLogWriter {
    queue: Arc<LogQueue>,
    partial: Vec<u8>,
}

impl BatchedLogWriter {
    /// Writer that feeds `queue`.
    pub fn new(queue: Arc<LogQueue>) -> Self {
        Self {
            queue,
            partial: Vec::new(),
        }
    }
}

impl Write for BatchedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            self.queue
                .push_back(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.partial.is_empty() {
            let mut line = String::from_utf8_lossy(&self.partial).into_owned();
            line.push('\n');
            self.partial.clear();
            self.queue.push_back(line);
        }
        Ok(())
    }
}

/// Background thread that moves queued lines into a sink.
pub struct LogWorker {
    /// Shutdown flag shared with worker thread.
    shutdown: Arc<AtomicBool>,
    /// Worker thread handle.
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LogWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWorker")
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl LogWorker {
    /// Start draining `queue` into `sink`.
    pub fn spawn<W>(queue: Arc<LogQueue>, sink: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread_handle = thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || Self::worker_loop(&queue, sink, &shutdown_clone))
            .context("Failed to spawn log writer thread")?;

        Ok(Self {
            shutdown,
            thread_handle: Some(thread_handle),
        })
    }

    /// Worker loop - runs on dedicated thread.
    fn worker_loop<W: Write>(queue: &LogQueue, mut sink: W, shutdown: &AtomicBool) {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                // Drain remaining lines before exiting
                while write_batch(queue, &mut sink, LOG_BATCH_SIZE) > 0 {}
                break;
            }
            write_batch(queue, &mut sink, LOG_BATCH_SIZE);
            thread::sleep(LOG_FLUSH_INTERVAL);
        }
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for LogWorker {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Write up to `limit` lines, then flush. Returns how many were written.
fn write_batch<W: Write>(queue: &LogQueue, sink: &mut W, limit: usize) -> usize {
    let mut written = 0;
    while written < limit {
        let Some(line) = queue.try_pop_front() else {
            break;
        };
        // A broken sink drops the line; nothing else could report it.
        let _ = sink.write_all(line.as_bytes());
        written += 1;
    }
    if written > 0 {
        let _ = sink.flush();
    }
    written
}

/// Install `env_logger` (default filter `info`, `RUST_LOG` overrides) with
/// output batched into `sink`. Keep the returned worker alive until exit;
/// dropping it flushes everything still queued.
pub fn init<W>(sink: W) -> Result<LogWorker>
where
    W: Write + Send + 'static,
{
    let queue = Arc::new(LogQueue::default());
    let worker = LogWorker::spawn(Arc::clone(&queue), sink)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(BatchedLogWriter::new(queue))))
        .format_timestamp_secs()
        .try_init()
        .context("Logger already initialized")?;

    Ok(worker)
}
