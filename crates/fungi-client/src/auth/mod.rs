//! Auth handshake for private channels
//!
//! Private channels are subscribed with a token obtained from the
//! application's own auth endpoint. The client never signs anything itself.

mod error;
mod handshake;

pub use error::AuthError;
pub use handshake::{AuthRequest, AuthResponse, Authorizer, HttpAuthorizer};
