//! HS512 access tokens.

pub mod claims;
pub mod codec;

pub use claims::{AccessClaims, AccessToken, ISSUER};
pub use codec::AccessTokenCodec;
