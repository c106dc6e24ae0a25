//! Shared building blocks for the notesync client.
//!
//! Everything that more than one backend or the presentation layer needs
//! lives here: entity models, the collection query algebra, the backend
//! capability traits, the error taxonomy and the route table.

pub mod backend;
pub mod document;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod storage;
pub mod text;
pub mod types;
