//! InfluxQL statements for user management

use crate::model::Password;

pub const SHOW_USERS: &str = "SHOW USERS";

/// Quote an identifier: `alice` -> `"alice"`
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", escape(ident, '"'))
}

/// Quote a string literal: `p'w` -> `'p\'w'`
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape(value, '\''))
}

fn escape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn create_user(name: &str, password: &Password, admin: bool) -> String {
    let mut stmt = format!(
        "CREATE USER {} WITH PASSWORD {}",
        quote_ident(name),
        quote_literal(password.expose())
    );
    if admin {
        stmt.push_str(" WITH ALL PRIVILEGES");
    }
    stmt
}

pub fn drop_user(name: &str) -> String {
    format!("DROP USER {}", quote_ident(name))
}

pub fn set_admin(name: &str, admin: bool) -> String {
    if admin {
        format!("GRANT ALL PRIVILEGES TO {}", quote_ident(name))
    } else {
        format!("REVOKE ALL PRIVILEGES FROM {}", quote_ident(name))
    }
}

pub fn set_password(name: &str, password: &Password) -> String {
    format!(
        "SET PASSWORD FOR {} = {}",
        quote_ident(name),
        quote_literal(password.expose())
    )
}
