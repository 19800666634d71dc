//! `demeter-auth`: token validation, roles, and the authorization policy.
//!
//! No HTTP or storage here. A bearer token becomes [`JwtClaims`], the claims
//! become a [`Principal`], and [`authorize`] checks it against an [`Access`] level.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{Access, AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
