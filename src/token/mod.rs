//! RS256 JSON Web Token codec shared by identity-token verification and
//! session issuance.
//!
//! Only the compact serialization with `alg = RS256` is supported. Claim
//! validation (issuer, audience, expiry) is left to the caller since identity
//! tokens and session tokens carry different rules.

mod jwks;
mod jwt;

pub use jwks::{Jwk, Jwks};
pub use jwt::{Error, JwtHeader, SessionKeys, sign_rs256, verify_rs256};
