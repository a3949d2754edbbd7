mod auth_service_impl;
mod clock_impl;
mod credential_hasher_argon2;
mod credential_issuer;
mod store_deadline;
mod token_codec_jwt;

pub use auth_service_impl::*;
pub use clock_impl::*;
pub use credential_hasher_argon2::*;
pub use credential_issuer::*;
pub use token_codec_jwt::*;
