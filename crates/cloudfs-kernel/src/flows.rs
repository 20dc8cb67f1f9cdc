//! FlowBus pub/sub for filesystem lifecycle events.
//!
//! The adapter publishes one [`FsFlow`] per successful mutation. Hosts
//! subscribe with NATS-style subject patterns to the events they care about.
//!
//! # Pattern Matching
//!
//! Patterns use dot-separated tokens with wildcards:
//! - `*` matches exactly one token: `file.*` matches `file.written` but not `directory.created`
//! - `>` matches one or more tokens (only at end): `>` matches everything
//! - Exact match: `file.moved` only matches `file.moved`
//!
//! # Example
//!
//! ```ignore
//! let fs = ObjectStoreFs::new(store, &config);
//! let mut sub = fs.subscribe("directory.*");
//!
//! fs.create_directory("~/upload/28").await?;
//!
//! while let Some(msg) = sub.recv().await {
//!     println!("{}: {}", msg.subject, msg.payload.source_path());
//! }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity for a filesystem's bus.
pub const DEFAULT_FLOW_CAPACITY: usize = 1024;

// ============================================================================
// Pattern Matching
// ============================================================================

/// Check if a subject matches a pattern.
///
/// ```ignore
/// assert!(matches_pattern("file.*", "file.written"));
/// assert!(matches_pattern(">", "directory.deleted"));
/// assert!(!matches_pattern("file.*", "directory.created"));
/// ```
pub fn matches_pattern(pattern: &str, subject: &str) -> bool {
    let pattern_tokens: Vec<&str> = pattern.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    let mut pi = 0;
    let mut si = 0;

    while pi < pattern_tokens.len() && si < subject_tokens.len() {
        match pattern_tokens[pi] {
            ">" => {
                // `>` must be the last token
                return pi == pattern_tokens.len() - 1;
            }
            "*" => {
                pi += 1;
                si += 1;
            }
            token => {
                if token != subject_tokens[si] {
                    return false;
                }
                pi += 1;
                si += 1;
            }
        }
    }

    pi == pattern_tokens.len() && si == subject_tokens.len()
}

// ============================================================================
// Flow Message Types
// ============================================================================

/// Trait for payloads that know their subject.
pub trait HasSubject {
    fn subject(&self) -> &str;
}

/// A message published to the flow bus.
#[derive(Clone, Debug)]
pub struct FlowMessage<T> {
    /// The subject (derived from payload).
    pub subject: String,
    pub payload: T,
}

impl<T: HasSubject> FlowMessage<T> {
    pub fn new(payload: T) -> Self {
        let subject = payload.subject().to_string();
        Self {
            subject,
            payload,
        }
    }
}

// ============================================================================
// Filesystem Flow Events
// ============================================================================

/// Filesystem lifecycle events.
///
/// Paths are virtual (`~/...`) paths, except [`FsFlow::Deleted`], which
/// carries the path exactly as the caller passed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsFlow {
    /// A file was uploaded.
    Written { path: String },
    /// A file was copied server-side.
    Copied { from: String, to: String },
    /// A file was copied and its source removed.
    Moved { from: String, to: String },
    /// A file was removed.
    Deleted { path: String },
    /// A directory sentinel was created.
    DirectoryCreated { path: String },
    /// Reserved: directory moves are not supported, so this is never published.
    DirectoryMoved { from: String, to: String },
    /// A directory and everything under it was removed.
    DirectoryDeleted { path: String },
}

impl FsFlow {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Written { .. } => "file.written",
            Self::Copied { .. } => "file.copied",
            Self::Moved { .. } => "file.moved",
            Self::Deleted { .. } => "file.deleted",
            Self::DirectoryCreated { .. } => "directory.created",
            Self::DirectoryMoved { .. } => "directory.moved",
            Self::DirectoryDeleted { .. } => "directory.deleted",
        }
    }

    /// The path the operation acted on (the source for copies and moves).
    pub fn source_path(&self) -> &str {
        match self {
            Self::Written { path }
            | Self::Deleted { path }
            | Self::DirectoryCreated { path }
            | Self::DirectoryDeleted { path } => path,
            Self::Copied { from, .. } | Self::Moved { from, .. } | Self::DirectoryMoved { from, .. } => {
                from
            }
        }
    }

    /// The destination, for copies and moves.
    pub fn destination_path(&self) -> Option<&str> {
        match self {
            Self::Copied { to, .. } | Self::Moved { to, .. } | Self::DirectoryMoved { to, .. } => {
                Some(to)
            }
            _ => None,
        }
    }
}

impl HasSubject for FsFlow {
    fn subject(&self) -> &str {
        FsFlow::subject(self)
    }
}

// ============================================================================
// FlowBus
// ============================================================================

/// Type-parameterized pub/sub bus.
///
/// Uses a broadcast channel internally for multi-subscriber delivery.
/// Subscribers receive only messages matching their pattern.
#[derive(Debug)]
pub struct FlowBus<T: Clone + Send + 'static> {
    tx: broadcast::Sender<FlowMessage<T>>,
}

impl<T: Clone + Send + 'static> FlowBus<T> {
    /// Create a new flow bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl<T: Clone + Send + HasSubject + 'static> FlowBus<T> {
    /// Publish a payload to the bus.
    ///
    /// Returns the number of subscribers that received the message; zero
    /// subscribers is not an error.
    pub fn publish(&self, payload: T) -> usize {
        let msg = FlowMessage::new(payload);
        self.tx.send(msg).unwrap_or(0)
    }

    /// Subscribe to messages matching a pattern.
    pub fn subscribe(&self, pattern: &str) -> Subscription<T> {
        Subscription {
            pattern: pattern.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone + Send + 'static> Clone for FlowBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A subscription to a FlowBus with pattern filtering.
pub struct Subscription<T: Clone> {
    pattern: String,
    rx: broadcast::Receiver<FlowMessage<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Receive the next matching message, waiting if necessary.
    ///
    /// Returns None once every bus handle has been dropped.
    pub async fn recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Try to receive the next matching message without blocking.
    pub fn try_recv(&mut self) -> Option<FlowMessage<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches_pattern(&self.pattern, &msg.subject) {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(
                        pattern = %self.pattern,
                        lagged = n,
                        "Flow subscription lagged behind"
                    );
                }
            }
        }
    }

    /// Drain every matching message currently buffered.
    pub fn drain(&mut self) -> Vec<FlowMessage<T>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl<T: Clone> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
