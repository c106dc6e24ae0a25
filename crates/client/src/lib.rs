//! Backend-agnostic note client.
//!
//! [`NoteClient`] bundles the session, the mutation gateway and the image
//! attachment flow over one set of backend capabilities. Screens in
//! [`views`] are built on [`view_model::CollectionViewModel`] and hold no
//! state besides the snapshots it delivers.

pub mod attachments;
pub mod context;
pub mod gateway;
pub mod memory;
pub mod session;
pub mod view_model;
pub mod views;

pub use context::NoteClient;
pub use gateway::MutationGateway;
pub use session::Session;
pub use view_model::{CollectionViewModel, DocumentViewModel, Snapshot};
