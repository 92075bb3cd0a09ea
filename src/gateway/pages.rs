//! Server-rendered HTML for the catalog web UI.
//!
//! Every value that came from a user (names, emails, product fields,
//! messages echoing input) goes through `escape_html`.

use crate::auth::AuthStatus;
use crate::catalog::Product;

/// Inline banner shown above a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice<'a> {
    Success(&'a str),
    Error(&'a str),
}

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333; padding: 32px 20px;
    }
    .card {
        background: #fff; border-radius: 16px; padding: 32px; margin: 0 auto 24px;
        max-width: 720px; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    .narrow { max-width: 400px; }
    h1 { font-size: 28px; color: #1a1a2e; margin-bottom: 4px; }
    h2 { font-size: 20px; color: #1a1a2e; margin-bottom: 16px; }
    .subtitle { font-size: 14px; color: #666; margin-bottom: 24px; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #444; }
    .form-group input {
        width: 100%; padding: 12px 14px; border: 1.5px solid #ddd;
        border-radius: 10px; font-size: 16px; outline: none;
    }
    .form-group input:focus { border-color: #4a6cf7; }
    .btn {
        width: 100%; padding: 14px; border: none; border-radius: 10px;
        font-size: 16px; font-weight: 600; cursor: pointer;
    }
    .btn-primary { background: #4a6cf7; color: #fff; }
    .btn-secondary { background: #e8e8e8; color: #333; }
    .error { background: #fff0f0; color: #d32f2f; padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .success { background: #effaf0; color: #2e7d32; padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .link { text-align: center; margin-top: 16px; font-size: 14px; color: #666; }
    .link a { color: #4a6cf7; text-decoration: none; }
    .bar { display: flex; justify-content: space-between; align-items: center; margin-bottom: 24px; }
    .bar form .btn { width: auto; padding: 8px 16px; font-size: 14px; }
    table { width: 100%; border-collapse: collapse; font-size: 14px; }
    th, td { text-align: left; padding: 8px; border-bottom: 1px solid #eee; }
    th { color: #666; font-weight: 500; }
    td.num { text-align: right; font-variant-numeric: tabular-nums; }
    .empty { color: #999; font-size: 14px; }
    "#
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn notice_html(notice: Option<Notice<'_>>) -> String {
    match notice {
        Some(Notice::Success(text)) => format!(r#"<div class="success">{}</div>"#, escape_html(text)),
        Some(Notice::Error(text)) => format!(r#"<div class="error">{}</div>"#, escape_html(text)),
        None => String::new(),
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head><body>
{body}
</body></html>"#,
        title = escape_html(title),
        style = base_style(),
    )
}

pub fn render_login(notice: Option<Notice<'_>>) -> String {
    let notice = notice_html(notice);
    page(
        "Product Catalog - Login",
        &format!(
            r#"<div class="card narrow">
  <h1>Product Catalog</h1>
  <p class="subtitle">Log in to view and add products</p>
  {notice}
  <form method="POST" action="/login">
    <div class="form-group">
      <label>Email</label>
      <input type="email" name="email" required autocomplete="username" placeholder="you@example.com">
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn btn-primary">Login</button>
  </form>
  <div class="link">No account? <a href="/register">Register</a></div>
</div>"#
        ),
    )
}

pub fn render_register(notice: Option<Notice<'_>>) -> String {
    let notice = notice_html(notice);
    page(
        "Product Catalog - Register",
        &format!(
            r#"<div class="card narrow">
  <h1>Create account</h1>
  <p class="subtitle">Passwords need at least 6 characters</p>
  {notice}
  <form method="POST" action="/register">
    <div class="form-group">
      <label>Name</label>
      <input type="text" name="name" required maxlength="50" autocomplete="name">
    </div>
    <div class="form-group">
      <label>Email</label>
      <input type="email" name="email" required maxlength="100" autocomplete="email">
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" required minlength="6" autocomplete="new-password">
    </div>
    <div class="form-group">
      <label>Confirm password</label>
      <input type="password" name="password_confirm" required minlength="6" autocomplete="new-password">
    </div>
    <button type="submit" class="btn btn-primary">Register</button>
  </form>
  <div class="link">Already registered? <a href="/">Login</a></div>
</div>"#
        ),
    )
}

fn product_rows(products: &[Product]) -> String {
    if products.is_empty() {
        return r#"<p class="empty">No products yet.</p>"#.to_string();
    }
    let rows: String = products
        .iter()
        .map(|p| {
            format!(
                r#"<tr><td>{name}</td><td>{category}</td><td class="num">{price:.2}</td><td>{by}</td></tr>"#,
                name = escape_html(&p.name),
                category = escape_html(p.category.as_deref().unwrap_or("")),
                price = p.price,
                by = escape_html(p.added_by_email.as_deref().unwrap_or("")),
            )
        })
        .collect();
    format!(
        r#"<table>
  <thead><tr><th>Name</th><th>Category</th><th>Price</th><th>Added by</th></tr></thead>
  <tbody>{rows}</tbody>
</table>"#
    )
}

pub fn render_dashboard(
    status: &AuthStatus,
    products: &[Product],
    notice: Option<Notice<'_>>,
) -> String {
    let who = escape_html(
        status
            .name
            .as_deref()
            .or(status.email.as_deref())
            .unwrap_or(""),
    );
    let email = escape_html(status.email.as_deref().unwrap_or(""));
    let notice = notice_html(notice);
    let table = product_rows(products);
    page(
        "Product Catalog",
        &format!(
            r#"<div class="card">
  <div class="bar">
    <div><h1>Product Catalog</h1><p class="subtitle">Logged in as {who} ({email})</p></div>
    <form method="POST" action="/logout"><button type="submit" class="btn btn-secondary">Logout</button></form>
  </div>
  {notice}
  <h2>Add product</h2>
  <form method="POST" action="/products">
    <div class="form-group"><label>Name</label><input type="text" name="name" required maxlength="100"></div>
    <div class="form-group"><label>Category</label><input type="text" name="category" maxlength="50"></div>
    <div class="form-group"><label>Price</label><input type="text" name="price" required inputmode="decimal" placeholder="0.00"></div>
    <button type="submit" class="btn btn-primary">Add product</button>
  </form>
</div>
<div class="card">
  <h2>Products</h2>
  {table}
</div>"#
        ),
    )
}

pub fn render_error(message: &str) -> String {
    page(
        "Product Catalog - Error",
        &format!(
            r#"<div class="card narrow">
  <h1>Something went wrong</h1>
  <div class="error">{}</div>
  <div class="link"><a href="/">Try again</a></div>
</div>"#,
            escape_html(message)
        ),
    )
}
