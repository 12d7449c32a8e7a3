//! Session-domain identifiers, redacted secrets, and the token set model.

pub mod id;
pub mod secret;
pub mod token;

pub use id::*;
pub use secret::*;
pub use token::*;
