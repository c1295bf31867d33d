//! Incrementally copy messages stored by Mailgun into a local Maildir.
//!
//! The event log is walked oldest-first from the last checkpoint, each
//! stored message is fetched once, and ids already imported are skipped.

pub mod auth;
pub mod config;
pub mod domain;
pub mod import;
pub mod mail;
pub mod store;

pub use domain::event::{Event, Message, StoredMessage, Timestamp};
pub use import::{ImportOptions, ImportStats, run_import};
pub use mail::error::ProviderError;
pub use mail::events_client::{EventLogClient, EventSource, EventStream};
pub use store::checkpoint::Checkpoint;
pub use store::maildir::MaildirSink;
pub use store::sink::{MailSink, MemorySink};
