mod auth_service;
mod clock;

pub use auth_service::*;
pub use clock::*;
