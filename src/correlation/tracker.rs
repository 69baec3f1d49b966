use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;

use crate::protocol::RtspRequest;

/// Table of requests sent but not yet answered, keyed by CSeq.
///
/// Senders insert on successful send; the read task drains entries when a
/// response with a matching CSeq arrives. Entries for requests the peer
/// never answers stay in the table; there is no TTL sweeper.
pub struct OutstandingRequests {
    entries: RwLock<HashMap<u32, RtspRequest>>,
    next_cseq: AtomicU32,
}

impl OutstandingRequests {
    /// Create an empty table; the first assigned cseq is 1
    pub fn new() -> Self {
        OutstandingRequests {
            entries: RwLock::new(HashMap::new()),
            next_cseq: AtomicU32::new(0),
        }
    }

    /// Assign the next sequence number to a clone of `request` and record
    /// it as outstanding.
    ///
    /// The caller's instance is never mutated; the returned clone is the
    /// one to serialize.
    pub async fn register(&self, request: &RtspRequest) -> RtspRequest {
        let cseq = self.next_cseq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut tracked = request.clone();
        tracked.set_cseq(cseq);

        self.entries.write().await.insert(cseq, tracked.clone());
        tracked
    }

    /// Remove and return the outstanding request for `cseq`
    pub async fn take(&self, cseq: u32) -> Option<RtspRequest> {
        self.entries.write().await.remove(&cseq)
    }

    /// Number of requests still awaiting a response
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// The last sequence number handed out
    pub fn last_cseq(&self) -> u32 {
        self.next_cseq.load(Ordering::SeqCst)
    }
}

impl Default for OutstandingRequests {
    fn default() -> Self {
        OutstandingRequests::new()
    }
}
