//! Storage traits for auth-related data.
//!
//! Persistence is a collaborator concern: the engine talks to these
//! traits and ships an in-memory backend for development and tests.

pub mod account;
pub mod application;
pub mod grant;
pub mod jti;
pub mod token;

pub use account::AccountStorage;
pub use application::ApplicationStorage;
pub use grant::GrantStorage;
pub use jti::JtiStorage;
pub use token::TokenStorage;
