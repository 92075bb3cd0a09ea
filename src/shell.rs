//! Interactive terminal front-end.
//!
//! Owns exactly one `SessionContext` for the lifetime of the shell. Each
//! menu pick is one request/response round through the `Gate`; the menu is
//! redrawn afterwards so it always matches the session state.

use anyhow::{bail, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};

use crate::auth::{AuthError, Registration, SessionContext};
use crate::catalog::{parse_price, NewProduct, Product};
use crate::gate::{Gate, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    Login,
    AddProduct,
    ListProducts,
    MyProducts,
    Logout,
    Quit,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Login => "Login",
            Self::AddProduct => "Add product",
            Self::ListProducts => "List products",
            Self::MyProducts => "My products",
            Self::Logout => "Logout",
            Self::Quit => "Quit",
        }
    }
}

/// Menu entries available for the current session.
pub fn menu_for(session: &SessionContext) -> &'static [Action] {
    if session.is_authenticated() {
        &[
            Action::AddProduct,
            Action::ListProducts,
            Action::MyProducts,
            Action::Logout,
            Action::Quit,
        ]
    } else {
        &[Action::Register, Action::Login, Action::Quit]
    }
}

pub struct Shell {
    gate: Gate,
    session: SessionContext,
    theme: ColorfulTheme,
}

impl Shell {
    pub fn new(gate: Gate) -> Self {
        Self {
            gate,
            session: SessionContext::new(),
            theme: ColorfulTheme::default(),
        }
    }

    /// Run until the user quits or the store fails.
    pub fn run(&mut self) -> Result<()> {
        println!("{}", style("Product Catalog").bold().cyan());
        loop {
            self.print_header();
            let actions = menu_for(&self.session);
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            let pick = Select::with_theme(&self.theme)
                .with_prompt("What next?")
                .items(&labels)
                .default(0)
                .interact()?;

            let action = actions[pick];
            if action == Action::Quit {
                return Ok(());
            }
            if let Err(e) = self.dispatch(action) {
                match e.downcast_ref::<AuthError>() {
                    Some(auth) if auth.is_recoverable() => print_error(&auth.to_string()),
                    Some(auth) => bail!("{auth}"),
                    None => return Err(e),
                }
            }
        }
    }

    fn print_header(&self) {
        println!();
        match (self.session.name(), self.session.email()) {
            (Some(name), Some(email)) => {
                println!("Logged in as {} ({})", style(name).green(), email);
            }
            _ => println!("{}", style("Not logged in").dim()),
        }
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Register => {
                let form = Registration {
                    name: self.prompt("Name")?,
                    email: self.prompt("Email")?,
                    password: self.secret("Password")?,
                    password_confirm: self.secret("Confirm password")?,
                };
                report(self.gate.register_outcome(&form))?;
            }
            Action::Login => {
                let email = self.prompt("Email")?;
                let password = self.secret("Password")?;
                report(self.gate.login_outcome(&mut self.session, &email, &password))?;
            }
            Action::AddProduct => {
                let name = self.prompt("Product name")?;
                let category = self.prompt("Category (optional)")?;
                let price = parse_price(&self.prompt("Price")?)?;
                let product = NewProduct {
                    name,
                    category,
                    price,
                };
                report(self.gate.add_product_outcome(&self.session, &product))?;
            }
            Action::ListProducts => {
                let products = self.gate.products(&self.session)?;
                print_products(&products);
            }
            Action::MyProducts => {
                let products = self.gate.my_products(&self.session)?;
                print_products(&products);
            }
            Action::Logout => {
                report(self.gate.logout_outcome(&mut self.session))?;
            }
            Action::Quit => {}
        }
        Ok(())
    }

    fn prompt(&self, label: &str) -> Result<String> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()?)
    }

    fn secret(&self, label: &str) -> Result<String> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()?)
    }
}

/// Print an outcome inline; a store failure becomes the shell's error.
fn report(outcome: Outcome) -> Result<()> {
    match outcome.cause {
        Some(e) if !e.is_recoverable() => Err(e.into()),
        Some(_) => {
            print_error(&outcome.message);
            Ok(())
        }
        None => {
            print_success(&outcome.message);
            Ok(())
        }
    }
}

fn print_success(message: &str) {
    println!("{} {}", style("✔").green(), message);
}

fn print_error(message: &str) {
    println!("{} {}", style("✘").red(), message);
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("{}", style("No products yet.").dim());
        return;
    }
    print!("{}", format_products(products));
}

/// Fixed-width product table.
pub fn format_products(products: &[Product]) -> String {
    let name_width = products
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let category_width = products
        .iter()
        .map(|p| p.category.as_deref().unwrap_or("").chars().count())
        .max()
        .unwrap_or(0)
        .max("Category".len());

    let mut out = format!(
        "{:<name_width$}  {:<category_width$}  {:>12}  {}\n",
        "Name", "Category", "Price", "Added by"
    );
    for p in products {
        out.push_str(&format!(
            "{:<name_width$}  {:<category_width$}  {:>12.2}  {}\n",
            p.name,
            p.category.as_deref().unwrap_or(""),
            p.price,
            p.added_by_email.as_deref().unwrap_or(""),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_out_menu_offers_register_and_login() {
        let session = SessionContext::new();
        assert_eq!(
            menu_for(&session),
            &[Action::Register, Action::Login, Action::Quit]
        );
    }

    #[test]
    fn logged_in_menu_offers_catalog_and_logout() {
        let mut session = SessionContext::new();
        session.sign_in("ann@x.com", "Ann");
        let menu = menu_for(&session);
        assert!(menu.contains(&Action::AddProduct));
        assert!(menu.contains(&Action::Logout));
        assert!(!menu.contains(&Action::Login));
        assert_eq!(menu.last(), Some(&Action::Quit));
    }

    #[test]
    fn report_ends_the_shell_only_on_store_failure() {
        assert!(report(AuthError::InvalidCredentials.into()).is_ok());
        assert!(report(AuthError::validation("Passwords do not match").into()).is_ok());

        let err = report(AuthError::StoreUnavailable("disk I/O error".into()).into()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn product_table_aligns_columns() {
        let products = vec![
            Product {
                id: 2,
                name: "Desk lamp".into(),
                category: Some("Home".into()),
                price: 19.5,
                added_by_email: Some("ann@x.com".into()),
            },
            Product {
                id: 1,
                name: "Pen".into(),
                category: None,
                price: 1.0,
                added_by_email: None,
            },
        ];
        let table = format_products(&products);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name     "));
        assert!(lines[1].contains("19.50"));
        assert!(lines[2].contains("1.00"));
        assert_eq!(lines[1].find("Home"), lines[0].find("Category"));
    }
}
