//! Data types shared across the auth system.

pub mod account;
pub mod application;
pub mod grant;
pub mod token_record;

pub use account::Account;
pub use application::Application;
pub use grant::Grant;
pub use token_record::TokenRecord;
