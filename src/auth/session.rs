use serde::Serialize;

/// Authentication state for one interactive client.
///
/// Starts unauthenticated. Only a successful login sets it and only an
/// explicit logout clears it; there is no expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<SessionIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionIdentity {
    email: String,
    name: String,
}

/// Snapshot returned by `IsAuthenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sign_in(&mut self, email: &str, name: &str) {
        self.identity = Some(SessionIdentity {
            email: email.to_string(),
            name: name.to_string(),
        });
    }

    pub(crate) fn sign_out(&mut self) {
        self.identity = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.email.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            authenticated: self.is_authenticated(),
            email: self.email().map(str::to_string),
            name: self.name().map(str::to_string),
        }
    }
}
