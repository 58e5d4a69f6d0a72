//! Outbound eviction notifications.
//!
//! When the cache evicts a part it publishes the part's [`ObjectIndex`]
//! exactly once; the storage layer resolves the fingerprint to on-disk
//! bytes and deletes them. The cache publishes while holding its lock, so
//! sinks must not block: hand the value off and return. A refused
//! notification is logged and the eviction is treated as complete — the
//! storage layer is responsible for its own reconciliation.

use crate::object::ObjectIndex;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::fmt;

/// Errors a sink may report for a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The sink is at capacity and dropped the notification.
    Refused,
    /// The receiving side has hung up.
    Disconnected,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused => write!(f, "sink at capacity, notification dropped"),
            Self::Disconnected => write!(f, "sink receiver hung up"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Where eviction notifications go.
///
/// Implementations must be non-blocking; they run inside the cache's
/// critical section.
pub trait RemovalSink: Send + Sync {
    /// Publish one evicted part.
    fn remove(&self, evicted: ObjectIndex) -> Result<(), SinkError>;
}

impl<F> RemovalSink for F
where
    F: Fn(ObjectIndex) -> Result<(), SinkError> + Send + Sync,
{
    fn remove(&self, evicted: ObjectIndex) -> Result<(), SinkError> {
        (self)(evicted)
    }
}

/// Bounded-channel sink with a drop policy.
///
/// `try_send` keeps the cache's critical section wait-free: when the
/// storage layer falls behind and the channel fills up, notifications are
/// dropped with [`SinkError::Refused`] rather than stalling traffic.
pub struct ChannelSink {
    tx: Sender<ObjectIndex>,
}

impl ChannelSink {
    /// Wrap an existing bounded sender.
    pub fn new(tx: Sender<ObjectIndex>) -> Self {
        Self { tx }
    }

    /// Create a sink and its receiving end with the given capacity.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ObjectIndex>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl RemovalSink for ChannelSink {
    fn remove(&self, evicted: ObjectIndex) -> Result<(), SinkError> {
        self.tx.try_send(evicted).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Refused,
            TrySendError::Disconnected(_) => SinkError::Disconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;

    fn part(n: u32) -> ObjectIndex {
        ObjectIndex::new(ObjectId::new("1.1", "/path"), n)
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, rx) = ChannelSink::bounded(4);
        sink.remove(part(1)).unwrap();
        sink.remove(part(2)).unwrap();

        assert_eq!(rx.try_iter().map(|oi| oi.part()).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn test_channel_sink_refuses_when_full() {
        let (sink, _rx) = ChannelSink::bounded(1);
        sink.remove(part(1)).unwrap();
        assert_eq!(sink.remove(part(2)), Err(SinkError::Refused));
    }

    #[test]
    fn test_channel_sink_disconnected() {
        let (sink, rx) = ChannelSink::bounded(1);
        drop(rx);
        assert_eq!(sink.remove(part(1)), Err(SinkError::Disconnected));
    }

    #[test]
    fn test_closure_sink() {
        let sink = |evicted: ObjectIndex| {
            assert_eq!(evicted.part(), 9);
            Ok(())
        };
        assert_eq!(RemovalSink::remove(&sink, part(9)), Ok(()));
    }
}
