//! OAuth 2.0 grant handling.

pub mod assertion;
pub mod implicit;
pub mod request;
pub mod request_object;

pub use assertion::{
    AssertionEngine, AssertionGrantHandler, AssertionPrincipal, AssertionRegistry,
    ClientAssertionHandler, JwtBearerHandler, assertion_grant_type, client_assertion_type,
};
pub use implicit::{AuthorizeRequest, FragmentResponse, ImplicitGrantResponder};
pub use request::{TokenRequest, TokenResponse};
pub use request_object::RequestObjectVerifier;
