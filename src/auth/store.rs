//! Credential store over the `users` table.
//!
//! Email uniqueness is checked with a read before the insert. The read and
//! the write take the connection lock separately, so two concurrent
//! registrations for one email can both pass the pre-check; the UNIQUE index
//! on `users.email` then rejects the second insert.

use rusqlite::{params, OptionalExtension};

use super::error::AuthError;
use super::hashing::{generate_salt, hash_password, verify_password};
use crate::store::Database;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Column width of `users.name`.
pub const MAX_NAME_CHARS: usize = 50;

/// Column width of `users.email`.
pub const MAX_EMAIL_CHARS: usize = 100;

/// Salt used for the dummy digest on unknown emails (32 hex chars).
const DUMMY_SALT: &str = "00000000000000000000000000000000";

/// A registered user, without credential material.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Input to `register`, as typed into the signup form. Missing fields
/// deserialize as empty so they fail validation instead of parsing.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new user. Returns the stored record.
    pub fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let name = form.name.trim();
        let email = form.email.trim();
        validate_registration(name, email, &form.password, &form.password_confirm)?;

        if self.email_exists(email)? {
            return Err(AuthError::DuplicateEmail(email.to_string()));
        }

        let salt = generate_salt();
        let password_hash = hash_password(&salt, &form.password);

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO users (name, email, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, password_hash, hex::encode(salt)],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(AuthError::DuplicateEmail(email.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Verify an email + password pair. Returns the `User` on success.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT id, name, email, password_hash, salt FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                        },
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((user, Some(stored_hash), Some(salt))) => {
                if verify_password(password, &salt, &stored_hash) {
                    Ok(user)
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            }
            Some(_) => {
                tracing::warn!(email = %email, "User record has no credential material");
                Err(reject_with_dummy_digest(password))
            }
            None => Err(reject_with_dummy_digest(password)),
        }
    }

    pub fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let conn = self.db.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1",
                params![email.trim()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// All users in registration order.
    pub fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT id, name, email FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn user_count(&self) -> Result<u64, AuthError> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Spend one digest on a login that cannot succeed, so every failure path
/// costs the same as a wrong password.
fn reject_with_dummy_digest(password: &str) -> AuthError {
    let _ = verify_password(password, DUMMY_SALT, "");
    AuthError::InvalidCredentials
}

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    password_confirm: &str,
) -> Result<(), AuthError> {
    if name.is_empty() || email.is_empty() || password.is_empty() || password_confirm.is_empty()
    {
        return Err(AuthError::validation("Please fill in all fields"));
    }
    if password != password_confirm {
        return Err(AuthError::validation("Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::validation(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AuthError::validation(format!(
            "Name too long (max {MAX_NAME_CHARS} characters)"
        )));
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(AuthError::validation(format!(
            "Email too long (max {MAX_EMAIL_CHARS} characters)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(&tmp.path().join("auth.db")).unwrap();
        (tmp, CredentialStore::new(db))
    }

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> Registration {
        Registration {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            password_confirm: confirm.into(),
        }
    }

    #[test]
    fn register_and_authenticate() {
        let (_tmp, store) = test_store();

        let user = store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        assert_eq!(user.email, "ann@x.com");

        let authed = store.authenticate("ann@x.com", "secret1").unwrap();
        assert_eq!(authed, user);
    }

    #[test]
    fn register_duplicate_email_fails() {
        let (_tmp, store) = test_store();

        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        let err = store
            .register(&form("Bob", "ann@x.com", "abcdef", "abcdef"))
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateEmail("ann@x.com".into()));
    }

    #[test]
    fn duplicate_check_ignores_surrounding_whitespace() {
        let (_tmp, store) = test_store();

        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        let err = store
            .register(&form("Ann", "  ann@x.com ", "secret1", "secret1"))
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail(_)));
    }

    #[test]
    fn constraint_failure_on_insert_reports_duplicate_email() {
        let (_tmp, store) = test_store();

        // The pre-check sees no row, then the insert hits a constraint, as the
        // losing side of two concurrent registrations does.
        store
            .db
            .conn()
            .execute_batch(
                "CREATE TRIGGER race BEFORE INSERT ON users BEGIN SELECT RAISE(ABORT, 'race'); END;",
            )
            .unwrap();
        let err = store
            .register(&form("Ann", "a@x.com", "secret1", "secret1"))
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateEmail("a@x.com".into()));
        assert_eq!(store.user_count().unwrap(), 0);
    }

    #[test]
    fn unique_index_rejects_second_row_for_email() {
        let (_tmp, store) = test_store();

        let insert = "INSERT INTO users (name, email, password_hash, salt) VALUES ('x', 'race@x.com', 'h', 's')";
        store.db.conn().execute(insert, []).unwrap();
        let err = store.db.conn().execute(insert, []).unwrap_err();
        assert!(matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
        ));
    }

    #[test]
    fn register_empty_fields_fail() {
        let (_tmp, store) = test_store();

        for f in [
            form("", "a@x.com", "secret1", "secret1"),
            form("Ann", "", "secret1", "secret1"),
            form("Ann", "a@x.com", "", "secret1"),
            form("Ann", "a@x.com", "secret1", ""),
            form("   ", "a@x.com", "secret1", "secret1"),
        ] {
            let err = store.register(&f).unwrap_err();
            assert_eq!(err, AuthError::validation("Please fill in all fields"));
        }
        assert_eq!(store.user_count().unwrap(), 0);
    }

    #[test]
    fn register_password_mismatch_fails() {
        let (_tmp, store) = test_store();

        let err = store
            .register(&form("Ann", "a@x.com", "secret1", "secret2"))
            .unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn register_short_password_fails() {
        let (_tmp, store) = test_store();

        let err = store
            .register(&form("Ann", "a@x.com", "short", "short"))
            .unwrap_err();
        assert!(err.to_string().contains("6 characters"));

        // Exactly six is enough.
        assert!(store
            .register(&form("Ann", "a@x.com", "sixsix", "sixsix"))
            .is_ok());
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        let (_tmp, store) = test_store();

        // Five characters, fifteen bytes.
        let err = store
            .register(&form("Ann", "a@x.com", "密码密码密", "密码密码密"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn register_overlong_fields_fail() {
        let (_tmp, store) = test_store();

        let long_name = "n".repeat(MAX_NAME_CHARS + 1);
        let err = store
            .register(&form(&long_name, "a@x.com", "secret1", "secret1"))
            .unwrap_err();
        assert!(err.to_string().contains("Name too long"));

        let long_email = format!("{}@x.com", "e".repeat(MAX_EMAIL_CHARS));
        let err = store
            .register(&form("Ann", &long_email, "secret1", "secret1"))
            .unwrap_err();
        assert!(err.to_string().contains("Email too long"));
    }

    #[test]
    fn stored_row_has_hex_salt_and_hash() {
        let (_tmp, store) = test_store();

        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        let (hash, salt): (String, String) = store
            .db
            .conn()
            .query_row(
                "SELECT password_hash, salt FROM users WHERE email = 'ann@x.com'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(salt.len(), 32);
        assert_eq!(hash, hash_password(&hex::decode(&salt).unwrap(), "secret1"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let (_tmp, store) = test_store();

        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        store
            .register(&form("Bob", "bob@x.com", "secret1", "secret1"))
            .unwrap();
        let salts: Vec<String> = {
            let conn = store.db.conn();
            let mut stmt = conn.prepare("SELECT salt FROM users").unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        };
        assert_ne!(salts[0], salts[1]);
    }

    #[test]
    fn authenticate_wrong_password_fails() {
        let (_tmp, store) = test_store();

        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        let err = store.authenticate("ann@x.com", "wrong").unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[test]
    fn authenticate_unknown_email_fails_the_same_way() {
        let (_tmp, store) = test_store();

        let err = store.authenticate("ghost@x.com", "anything").unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[test]
    fn authenticate_row_without_salt_fails() {
        let (_tmp, store) = test_store();

        store
            .db
            .conn()
            .execute(
                "INSERT INTO users (name, email) VALUES ('Legacy', 'legacy@x.com')",
                [],
            )
            .unwrap();
        let err = store.authenticate("legacy@x.com", "").unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[test]
    fn list_users_in_registration_order() {
        let (_tmp, store) = test_store();

        assert!(store.list_users().unwrap().is_empty());
        store
            .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
            .unwrap();
        store
            .register(&form("Bob", "bob@x.com", "abcdef", "abcdef"))
            .unwrap();

        let names: Vec<_> = store.list_users().unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("auth.db");
        {
            let store = CredentialStore::new(Database::open(&path).unwrap());
            store
                .register(&form("Ann", "ann@x.com", "secret1", "secret1"))
                .unwrap();
        }
        let store = CredentialStore::new(Database::open(&path).unwrap());
        assert!(store.authenticate("ann@x.com", "secret1").is_ok());
    }
}
