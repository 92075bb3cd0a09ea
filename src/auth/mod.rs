//! Credential store and session gate.
//!
//! Provides:
//! - User registration with name/email/password (single-round SHA-256 over
//!   a per-user 16-byte salt, hex-encoded in the `users` table)
//! - Login verification against stored credentials
//! - A per-client `SessionContext` holding the authenticated flag and email
//!
//! ## Design Decisions
//! - The digest scheme is kept bit-compatible with existing records rather
//!   than upgraded to a slow KDF. Swapping it would orphan every stored hash.
//! - No session tokens or expiry. The UI layer owns one `SessionContext` per
//!   client and threads it through each call.

pub mod error;
pub mod hashing;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use session::{AuthStatus, SessionContext};
pub use store::{CredentialStore, Registration, User};
