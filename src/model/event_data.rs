use std::collections::HashMap;
use std::time::SystemTime;

/// One event received from a partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    /// Opaque payload.
    pub body: Vec<u8>,
    /// Service-assigned sequence number within the partition.
    pub sequence_number: i64,
    /// Resumable position token of this event; usable as a [`Cursor::Token`](crate::Cursor::Token).
    pub offset: String,
    /// When the service enqueued the event.
    pub enqueued_time: SystemTime,
    /// Application properties.
    pub properties: HashMap<String, String>,
}

impl EventData {
    /// Creates an event with the given payload, sequence number and offset token.
    pub fn new(body: impl Into<Vec<u8>>, sequence_number: i64, offset: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            sequence_number,
            offset: offset.into(),
            enqueued_time: SystemTime::now(),
            properties: HashMap::new(),
        }
    }

    /// Attaches an application property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
