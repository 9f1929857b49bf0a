//! # Partition context shared by a pump and its delivery bridge.
//!
//! [`PartitionContext`] is immutable apart from the runtime-info snapshot, which the
//! delivery bridge refreshes on each delivery when receiver metrics are enabled.
//! The application receives `&PartitionContext` in every processor hook.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

/// Starting read position for a partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// Opaque resumable position token (e.g. a checkpointed offset).
    Token(String),
    /// Point in time; reading starts at the first event enqueued after it.
    Timestamp(SystemTime),
}

impl Cursor {
    /// Creates a token cursor.
    pub fn token(token: impl Into<String>) -> Self {
        Cursor::Token(token.into())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Token(t) => write!(f, "token:{t}"),
            Cursor::Timestamp(ts) => write!(f, "timestamp:{ts:?}"),
        }
    }
}

/// Receiver-reported position of the partition's tail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverRuntimeInfo {
    pub partition_id: String,
    pub last_sequence_number: i64,
    pub last_enqueued_offset: String,
    pub last_enqueued_time: SystemTime,
    /// When the receiver obtained this information.
    pub retrieval_time: SystemTime,
}

/// Everything a processor hook needs to know about the partition it runs for.
#[derive(Debug)]
pub struct PartitionContext {
    partition_id: Arc<str>,
    consumer_group: Arc<str>,
    host_name: Arc<str>,
    initial_cursor: Option<Cursor>,
    runtime_info: RwLock<Option<ReceiverRuntimeInfo>>,
}

impl PartitionContext {
    /// Creates a context for `partition_id` in `consumer_group`, hosted by `host_name`.
    ///
    /// A `None` cursor is accepted here and rejected by the opener as a fatal
    /// configuration error.
    pub fn new(
        host_name: impl Into<Arc<str>>,
        consumer_group: impl Into<Arc<str>>,
        partition_id: impl Into<Arc<str>>,
        initial_cursor: Option<Cursor>,
    ) -> Self {
        Self {
            partition_id: partition_id.into(),
            consumer_group: consumer_group.into(),
            host_name: host_name.into(),
            initial_cursor,
            runtime_info: RwLock::new(None),
        }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn initial_cursor(&self) -> Option<&Cursor> {
        self.initial_cursor.as_ref()
    }

    /// Latest runtime info snapshot, if metrics are enabled and a delivery happened.
    pub fn runtime_info(&self) -> Option<ReceiverRuntimeInfo> {
        self.runtime_info.read().clone()
    }

    pub(crate) fn set_runtime_info(&self, info: ReceiverRuntimeInfo) {
        *self.runtime_info.write() = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_info_starts_empty() {
        let ctx = PartitionContext::new("host", "$Default", "4", Some(Cursor::token("T1")));
        assert!(ctx.runtime_info().is_none());
        assert_eq!(ctx.initial_cursor(), Some(&Cursor::token("T1")));

        let now = SystemTime::now();
        ctx.set_runtime_info(ReceiverRuntimeInfo {
            partition_id: "4".into(),
            last_sequence_number: 12,
            last_enqueued_offset: "480".into(),
            last_enqueued_time: now,
            retrieval_time: now,
        });
        assert_eq!(ctx.runtime_info().map(|i| i.last_sequence_number), Some(12));
    }

    #[test]
    fn cursor_display() {
        assert_eq!(Cursor::token("abc").to_string(), "token:abc");
    }
}
