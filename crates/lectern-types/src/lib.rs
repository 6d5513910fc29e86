pub mod api;
pub mod book;
pub mod error;
pub mod models;
pub mod moderation;
pub mod validate;

pub use error::DomainError;
