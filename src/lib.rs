//! storegate: a product catalog behind a salted-credential login gate.
//!
//! The library holds the credential store, the per-session gate and the
//! catalog; `gateway` and `shell` are the two front-ends that drive them.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod gate;
pub mod gateway;
pub mod shell;
pub mod store;

pub use auth::{AuthError, AuthStatus, CredentialStore, Registration, SessionContext, User};
pub use catalog::{NewProduct, Product, ProductCatalog};
pub use config::Config;
pub use gate::{Gate, Outcome};
pub use store::Database;
