//! Credential models: redacted secrets, acquired grants, and cached bearer tokens.

pub mod secret;
pub mod token;

pub use secret::*;
pub use token::*;
