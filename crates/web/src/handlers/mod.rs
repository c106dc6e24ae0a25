pub mod folders;
pub mod live;
pub mod notes;
pub mod profile;
pub mod session;
