//! Axum HTTP handlers for the discovery and introspection surfaces.

pub mod introspect;
pub mod jwks;
pub mod metadata;

pub use introspect::{IntrospectRequest, IntrospectState, introspect_handler};
pub use jwks::{JwksState, jwks_handler};
pub use metadata::{DiscoveryState, metadata_handler};
