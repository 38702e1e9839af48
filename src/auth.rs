//! Credentials, bearer token cache, and the token manager consulted before every request.

pub mod credentials;
pub mod manager;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use manager::*;
pub use secret::*;
pub use token::*;
