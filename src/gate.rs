//! Request/response handlers shared by every front-end.
//!
//! One call per user action: read the inputs, do at most one store read and
//! one store write, update the caller's `SessionContext`, and report an
//! `Outcome` the UI can render. Nothing here retries.

use serde::Serialize;

use crate::auth::{AuthError, AuthStatus, CredentialStore, Registration, SessionContext, User};
use crate::catalog::{NewProduct, Product, ProductCatalog};
use crate::store::Database;

/// Result of one UI action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    /// Session state changed; protected views must be redrawn.
    pub refresh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip)]
    pub cause: Option<AuthError>,
}

impl Outcome {
    fn ok(message: impl Into<String>, refresh: bool) -> Self {
        Self {
            success: true,
            message: message.into(),
            refresh,
            error: None,
            cause: None,
        }
    }

    /// A store failure; the front-end cannot continue the interaction.
    pub fn is_fatal(&self) -> bool {
        self.cause.as_ref().is_some_and(|e| !e.is_recoverable())
    }
}

impl From<AuthError> for Outcome {
    fn from(err: AuthError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            refresh: false,
            error: Some(err.kind()),
            cause: Some(err),
        }
    }
}

pub struct Gate {
    credentials: CredentialStore,
    catalog: ProductCatalog,
    allow_registration: bool,
}

impl Gate {
    pub fn new(db: Database, allow_registration: bool) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone()),
            catalog: ProductCatalog::new(db),
            allow_registration,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Create an account. Does not log the new user in.
    pub fn register(&self, form: &Registration) -> Result<User, AuthError> {
        if !self.allow_registration {
            return Err(AuthError::validation("Registration is disabled"));
        }
        match self.credentials.register(form) {
            Ok(user) => {
                tracing::info!(email = %user.email, user_id = user.id, "User registered");
                Ok(user)
            }
            Err(e) => {
                tracing::info!(email = %form.email.trim(), reason = e.kind(), "Registration rejected");
                Err(e)
            }
        }
    }

    /// Verify credentials and mark the session authenticated.
    ///
    /// A failed attempt leaves the session exactly as it was.
    pub fn login(
        &self,
        session: &mut SessionContext,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        match self.credentials.authenticate(email, password) {
            Ok(user) => {
                session.sign_in(&user.email, &user.name);
                tracing::info!(email = %user.email, "Login succeeded");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(email = %email.trim(), reason = e.kind(), "Login failed");
                Err(e)
            }
        }
    }

    /// Clear the session. Always succeeds.
    pub fn logout(&self, session: &mut SessionContext) {
        if let Some(email) = session.email() {
            tracing::info!(email = %email, "Logged out");
        }
        session.sign_out();
    }

    pub fn is_authenticated(&self, session: &SessionContext) -> AuthStatus {
        session.status()
    }

    pub fn add_product(
        &self,
        session: &SessionContext,
        product: &NewProduct,
    ) -> Result<Product, AuthError> {
        let added = self.catalog.add_product(session, product)?;
        tracing::info!(
            product_id = added.id,
            email = %session.email().unwrap_or_default(),
            "Product added"
        );
        Ok(added)
    }

    /// The full catalog. Hidden until the session is logged in.
    pub fn products(&self, session: &SessionContext) -> Result<Vec<Product>, AuthError> {
        if !session.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        self.catalog.list()
    }

    /// Products added by the logged-in user.
    pub fn my_products(&self, session: &SessionContext) -> Result<Vec<Product>, AuthError> {
        let email = session.email().ok_or(AuthError::NotAuthenticated)?;
        self.catalog.list_by(email)
    }

    // ── Outcome wrappers for UI collaborators ───────────────────────

    pub fn register_outcome(&self, form: &Registration) -> Outcome {
        match self.register(form) {
            Ok(_) => Outcome::ok("Registration successful! Please log in.", false),
            Err(e) => e.into(),
        }
    }

    pub fn login_outcome(&self, session: &mut SessionContext, email: &str, password: &str) -> Outcome {
        match self.login(session, email, password) {
            Ok(user) => Outcome::ok(format!("Welcome, {}!", user.name), true),
            Err(e) => e.into(),
        }
    }

    pub fn logout_outcome(&self, session: &mut SessionContext) -> Outcome {
        self.logout(session);
        Outcome::ok("You have been logged out.", true)
    }

    pub fn add_product_outcome(&self, session: &SessionContext, product: &NewProduct) -> Outcome {
        match self.add_product(session, product) {
            Ok(p) => Outcome::ok(format!("Product '{}' added.", p.name), false),
            Err(e) => e.into(),
        }
    }
}
