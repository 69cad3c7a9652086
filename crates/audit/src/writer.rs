//! Asynchronous audit persistence.
//!
//! Records are handed to a bounded channel and written by a background
//! worker, so the primary operation never waits on (or fails because of)
//! the audit store. A full channel drops the record and counts the drop;
//! `drain()` flushes everything in flight before shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::record::AuditRecord;
use crate::store::AuditStore;

enum Message {
    Record(Box<AuditRecord>),
    Flush(oneshot::Sender<()>),
}

/// Cheap-to-clone enqueue handle held by every audited repository.
#[derive(Clone)]
pub struct AuditWriter {
    tx: mpsc::Sender<Message>,
    dropped: Arc<AtomicU64>,
}

impl AuditWriter {
    /// Fire-and-forget: never blocks, never errors.
    pub fn enqueue(&self, record: AuditRecord) {
        if let Err(e) = self.tx.try_send(Message::Record(Box::new(record))) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "audit channel rejected record; dropping");
        }
    }

    /// Records dropped due to backpressure or a stopped worker.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until every record enqueued before this call has been handed to
    /// the store (or the timeout elapses). Used by tests and shutdown.
    pub async fn drain(&self, timeout: Duration) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Message::Flush(tx)).await.is_err() {
            return;
        }
        if tokio::time::timeout(timeout, rx).await.is_err() {
            warn!("audit drain timed out; records may be unflushed");
        }
    }
}

/// Owns the background worker task.
pub struct AuditWriterHandle {
    join: tokio::task::JoinHandle<()>,
    appended: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl AuditWriterHandle {
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn abort(self) {
        self.join.abort();
    }
}

/// Spawn the audit worker. `capacity` bounds the in-flight queue.
pub fn spawn(store: Arc<dyn AuditStore>, capacity: usize) -> (AuditWriter, AuditWriterHandle) {
    let (tx, mut rx) = mpsc::channel::<Message>(capacity);
    let appended = Arc::new(AtomicU64::new(0));
    let failed = Arc::new(AtomicU64::new(0));

    let worker_appended = appended.clone();
    let worker_failed = failed.clone();
    let join = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                Message::Record(record) => match store.append(*record).await {
                    Ok(()) => {
                        worker_appended.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        worker_failed.fetch_add(1, Ordering::Relaxed);
                        error!(error = %e, "audit append failed; record lost");
                    }
                },
                Message::Flush(ack) => {
                    // Messages are processed in order, so everything enqueued
                    // before the flush has already been handled here.
                    let _ = ack.send(());
                }
            }
        }
    });

    (
        AuditWriter {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        AuditWriterHandle {
            join,
            appended,
            failed,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::record::{AuditAction, AuditRecord};
    use crate::store::AuditQuery;
    use async_trait::async_trait;
    use remitdesk_core::{DomainError, DomainResult};
    use std::sync::Mutex;

    struct RecordingStore {
        records: Mutex<Vec<AuditRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditStore for RecordingStore {
        async fn append(&self, record: AuditRecord) -> DomainResult<()> {
            if self.fail {
                return Err(DomainError::internal("store down"));
            }
            self.records.lock().unwrap().push(record);
            Ok(())
        }

        async fn query(&self, query: &AuditQuery) -> DomainResult<Vec<AuditRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| query.matches(r))
                .cloned()
                .collect())
        }
    }

    fn record() -> AuditRecord {
        AuditRecord::new(
            AuditAction::Create,
            "transaction",
            "abc",
            &RequestContext::anonymous(),
        )
    }

    #[tokio::test]
    async fn drain_flushes_enqueued_records() {
        let store = Arc::new(RecordingStore {
            records: Mutex::new(Vec::new()),
            fail: false,
        });
        let (writer, handle) = spawn(store.clone(), 16);

        for _ in 0..5 {
            writer.enqueue(record());
        }
        writer.drain(Duration::from_secs(1)).await;

        assert_eq!(store.records.lock().unwrap().len(), 5);
        assert_eq!(handle.appended(), 5);
        assert_eq!(writer.dropped(), 0);
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_propagated() {
        let store = Arc::new(RecordingStore {
            records: Mutex::new(Vec::new()),
            fail: true,
        });
        let (writer, handle) = spawn(store, 16);

        writer.enqueue(record());
        writer.drain(Duration::from_secs(1)).await;

        assert_eq!(handle.appended(), 0);
        assert_eq!(handle.failed(), 1);
    }
}
