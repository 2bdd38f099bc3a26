// Repository layer for database operations

pub mod law;

pub use law::{LawRepository, LawStore};
