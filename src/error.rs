//! Error types used by the pump runtime, its transport seam and the renewal timer.
//!
//! - [`TransportError`] failures reported by the transport (client/receiver creation, delivery).
//! - [`OpenError`] the outcome of a failed connection open sequence.
//! - [`PumpError`] what the application's error hook receives.
//! - [`ProcessorError`] failures raised by application hooks.
//! - [`ConfigError`] rejected [`PumpOptions`](crate::PumpOptions).
//! - [`RenewalError`] failures raised by a token renewal action.
//!
//! Every enum provides `as_label` (stable snake_case, for logs/metrics).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Classification attached to every [`TransportError`].
///
/// The transport is expected to tell apart a fencing rejection from any other failure;
/// the opener and delivery bridge branch on this kind and never inspect message text.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// A receiver with a higher epoch is already active for the partition.
    EpochFenced,
    /// The operation did not complete in time.
    Timeout,
    /// The service rejected the credentials.
    Unauthorized,
    /// Connection level failure (socket, link, session).
    Connection,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportErrorKind::EpochFenced => "epoch_fenced",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Unauthorized => "unauthorized",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # Failure reported by the transport layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Typed classification.
    pub kind: TransportErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Creates a new error of the given kind.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`TransportErrorKind::EpochFenced`] error.
    pub fn fenced(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::EpochFenced, message)
    }

    /// Shorthand for a [`TransportErrorKind::Connection`] error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    /// Returns `true` when the receiver was rejected because a higher epoch holds the partition.
    pub fn is_fencing_conflict(&self) -> bool {
        self.kind == TransportErrorKind::EpochFenced
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        self.kind.as_label()
    }
}

/// # Errors produced by the connection open sequence.
///
/// `Fenced` and `InvalidCursor` are fatal: retrying cannot help.
/// `RetriesExhausted` carries the last transient error observed.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum OpenError {
    /// Another host holds a higher epoch for this partition.
    #[error("receiver rejected at epoch {epoch} (fencing conflict): {source}")]
    Fenced {
        /// The epoch this host tried to open with.
        epoch: u64,
        /// The transport rejection.
        source: TransportError,
    },

    /// The starting position is missing or malformed.
    #[error("invalid starting cursor: {reason}")]
    InvalidCursor {
        /// What is wrong with it.
        reason: String,
    },

    /// All attempts failed with transient errors.
    #[error("open failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error observed.
        last: TransportError,
    },

    /// The open sequence was cancelled by shutdown.
    #[error("open cancelled")]
    Cancelled,
}

impl OpenError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventpump::OpenError;
    ///
    /// let err = OpenError::InvalidCursor { reason: "missing".into() };
    /// assert_eq!(err.as_label(), "open_invalid_cursor");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            OpenError::Fenced { .. } => "open_fenced",
            OpenError::InvalidCursor { .. } => "open_invalid_cursor",
            OpenError::RetriesExhausted { .. } => "open_retries_exhausted",
            OpenError::Cancelled => "open_cancelled",
        }
    }

    /// Indicates whether the failure short-circuited the retry loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OpenError::Fenced { .. } | OpenError::InvalidCursor { .. })
    }
}

/// # Failure raised by an application hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessorError {
    /// Human-readable detail.
    pub message: String,
}

impl ProcessorError {
    /// Creates a new processor error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ProcessorError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ProcessorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// # Errors delivered to [`EventProcessor::on_error`](crate::EventProcessor::on_error).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PumpError {
    /// The application's `on_open` hook failed.
    #[error("on_open failed: {0}")]
    OnOpen(ProcessorError),

    /// The connection could not be opened.
    #[error(transparent)]
    Open(OpenError),

    /// The transport reported an error after the pump was running.
    #[error("delivery error: {0}")]
    Delivery(TransportError),

    /// The application's `on_events` hook failed.
    #[error("on_events failed: {0}")]
    Processor(ProcessorError),
}

impl PumpError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PumpError::OnOpen(_) => "pump_on_open",
            PumpError::Open(e) => e.as_label(),
            PumpError::Delivery(_) => "pump_delivery",
            PumpError::Processor(_) => "pump_processor",
        }
    }
}

/// # Rejected configuration values.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_batch_size` must be at least 1.
    #[error("max_batch_size must be > 0")]
    ZeroBatchSize,

    /// `prefetch_count` smaller than `max_batch_size` would starve batches.
    #[error("prefetch_count {prefetch} is lower than max_batch_size {batch}")]
    PrefetchBelowBatch {
        /// Configured prefetch depth.
        prefetch: u32,
        /// Configured batch size.
        batch: usize,
    },

    /// `open_retry.max_attempts` must be at least 1.
    #[error("open_retry.max_attempts must be > 0")]
    ZeroAttempts,

    /// `receive_timeout` must be non-zero.
    #[error("receive_timeout must be > 0, got {0:?}")]
    ZeroReceiveTimeout(Duration),

    /// No executor was given and the pump was built outside a tokio runtime.
    #[error("no executor configured and no tokio runtime available")]
    NoExecutor,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroBatchSize => "config_zero_batch_size",
            ConfigError::PrefetchBelowBatch { .. } => "config_prefetch_below_batch",
            ConfigError::ZeroAttempts => "config_zero_attempts",
            ConfigError::ZeroReceiveTimeout(_) => "config_zero_receive_timeout",
            ConfigError::NoExecutor => "config_no_executor",
        }
    }
}

/// # Failure raised by a renewal action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("token renewal failed: {message}")]
pub struct RenewalError {
    /// Human-readable detail.
    pub message: String,
}

impl RenewalError {
    /// Creates a new renewal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
