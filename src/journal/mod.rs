//! # Message Journal Module
//!
//! The bounded in-memory record of everything the bridge has seen or sent,
//! and the fan-out point feeding live viewers.
//!
//! ```text
//! journal/
//! ├── log_entry.rs    - Entry representation and wire form
//! └── message_log.rs  - Bounded FIFO log with subscriber fan-out
//! ```
//!
//! The [`message_log::MessageLog`] is the only shared mutable state in the
//! bridge: the broker connector appends from its event-loop task while
//! gateway viewers snapshot and subscribe from theirs. All mutation goes
//! through one mutex and fan-out never blocks the append path.

pub mod log_entry;
pub mod message_log;

pub use log_entry::{EntryKind, LogEntry};
pub use message_log::{LogEvent, MessageLog, SubscriberId};
