//! Change notifications and change-feed driven subscriptions.
//!
//! - [`ChangeBus`]: in-process publish/subscribe hub for [`ChangeEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`requery_feed`]: turns a change feed plus a fetch function into a
//!   full-snapshot [`SnapshotStream`](notesync_core::backend::SnapshotStream).

pub mod bus;
pub mod feed;

pub use bus::{ChangeBus, ChangeEvent, ChangeKind};
pub use feed::requery_feed;
