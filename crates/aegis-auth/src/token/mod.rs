//! Access token issuance and introspection.

pub mod introspection;
pub mod issuer;

pub use introspection::{IntrospectionPayload, Introspector};
pub use issuer::{IssuedToken, TokenIssuer};
