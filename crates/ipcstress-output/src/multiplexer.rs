//! Concurrent capture of child output streams into one printed feed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ipcstress_common::OUTPUT_QUEUE_POLL;
use ipcstress_process::ManagedProcess;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::{OutputLine, StreamKind};

/// Fans every attached process's stdout/stderr into a single queue and
/// prints the interleaved feed.
///
/// Reader task lifetime is scoped to its stream: end-of-stream (the child
/// exited and the pipe closed) ends the task. The printer dequeues with a
/// short timeout and stops once no reader remains open, so an empty queue
/// can never wedge it.
pub struct OutputMultiplexer {
    sender: mpsc::UnboundedSender<OutputLine>,
    receiver: Option<mpsc::UnboundedReceiver<OutputLine>>,
    open_readers: Arc<AtomicUsize>,
    attached_total: Arc<AtomicUsize>,
    printer: Option<JoinHandle<()>>,
}

impl Default for OutputMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputMultiplexer {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
            open_readers: Arc::new(AtomicUsize::new(0)),
            attached_total: Arc::new(AtomicUsize::new(0)),
            printer: None,
        }
    }

    /// Start reader tasks for both output streams of a child.
    pub fn attach(&self, process: &mut ManagedProcess) {
        let (stdout, stderr) = process.take_output();
        match stdout {
            Some(stream) => self.spawn_reader(process.label.clone(), StreamKind::Stdout, stream),
            None => warn!(label = %process.label, "stdout already taken, not capturing"),
        }
        match stderr {
            Some(stream) => self.spawn_reader(process.label.clone(), StreamKind::Stderr, stream),
            None => warn!(label = %process.label, "stderr already taken, not capturing"),
        }
    }

    fn spawn_reader<R>(&self, tag: String, kind: StreamKind, stream: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sender = self.sender.clone();
        let open_readers = Arc::clone(&self.open_readers);
        open_readers.fetch_add(1, Ordering::SeqCst);
        self.attached_total.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if !line.is_empty() {
                            // Receiver gone means the printer was already
                            // torn down; nothing left to do with the line.
                            let _ = sender.send(OutputLine {
                                tag: tag.clone(),
                                text: line,
                            });
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(tag = %tag, ?kind, error = %e, "stream read failed");
                        break;
                    }
                }
            }
            open_readers.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Start the printer task. Lines are printed the moment they are
    /// dequeued; on a queue timeout the printer re-checks whether any
    /// stream is still open and stops once none remain.
    pub fn start_printer(&mut self) {
        let Some(mut receiver) = self.receiver.take() else {
            warn!("printer already started");
            return;
        };
        let open_readers = Arc::clone(&self.open_readers);
        let attached_total = Arc::clone(&self.attached_total);

        self.printer = Some(tokio::spawn(async move {
            loop {
                match tokio::time::timeout(OUTPUT_QUEUE_POLL, receiver.recv()).await {
                    Ok(Some(line)) => println!("{}", line.render()),
                    Ok(None) => break,
                    Err(_) => {
                        let started = attached_total.load(Ordering::SeqCst) > 0;
                        if started && open_readers.load(Ordering::SeqCst) == 0 {
                            // Everything attached has closed its stream;
                            // drain whatever is still queued and stop.
                            while let Ok(line) = receiver.try_recv() {
                                println!("{}", line.render());
                            }
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Wait for the printer to finish (all attached streams closed and
    /// the queue drained).
    pub async fn wait_printer(&mut self) {
        if let Some(handle) = self.printer.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reader_tags_and_skips_empty_lines() {
        let mut mux = OutputMultiplexer::new();
        let (mut tx, rx) = tokio::io::duplex(256);

        mux.spawn_reader("CACHE".to_string(), StreamKind::Stdout, rx);
        tx.write_all(b"first\n\nsecond\n").await.unwrap();
        drop(tx);

        let mut receiver = mux.receiver.take().unwrap();
        let a = receiver.recv().await.unwrap();
        let b = receiver.recv().await.unwrap();
        assert_eq!(a.render(), "[CACHE] first");
        assert_eq!(b.render(), "[CACHE] second");

        // The empty line was dropped and the stream is closed.
        for _ in 0..50 {
            if mux.open_readers.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mux.open_readers.load(Ordering::SeqCst), 0);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_single_stream_order_is_preserved() {
        let mut mux = OutputMultiplexer::new();
        let (mut tx, rx) = tokio::io::duplex(1024);

        mux.spawn_reader("PROXY0".to_string(), StreamKind::Stderr, rx);
        for i in 0..20 {
            tx.write_all(format!("line {i}\n").as_bytes()).await.unwrap();
        }
        drop(tx);

        let mut receiver = mux.receiver.take().unwrap();
        for i in 0..20 {
            let line = receiver.recv().await.unwrap();
            assert_eq!(line.text, format!("line {i}"));
        }
    }

    #[tokio::test]
    async fn test_printer_stops_once_streams_close() {
        let mut mux = OutputMultiplexer::new();
        let (mut tx, rx) = tokio::io::duplex(256);

        mux.spawn_reader("DOWNLOAD".to_string(), StreamKind::Stdout, rx);
        mux.start_printer();

        tx.write_all(b"done\n").await.unwrap();
        drop(tx);

        // Must complete rather than hang.
        tokio::time::timeout(Duration::from_secs(5), mux.wait_printer())
            .await
            .expect("printer did not stop after streams closed");
    }
}
