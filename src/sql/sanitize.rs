//! SQL identifier validation and quoting
//!
//! Generated SELECT/INSERT/UPDATE/DELETE text uses bare `table.column` identifiers, so
//! every table and column name is validated once, when a schema is built, and reserved
//! words are refused there. The DDL helpers that take raw names still quote reserved
//! words with the dialect's quote character.

use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;

/// Keywords reserved by at least one supported dialect
pub const RESERVED_WORDS: &[&str] = &[
    "ADD",
    "ALL",
    "ALTER",
    "AND",
    "ANY",
    "AS",
    "ASC",
    "BETWEEN",
    "BY",
    "CASE",
    "CHECK",
    "COLUMN",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "DEFAULT",
    "DELETE",
    "DESC",
    "DISTINCT",
    "DROP",
    "ELSE",
    "END",
    "EXISTS",
    "FALSE",
    "FOR",
    "FOREIGN",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "IN",
    "INDEX",
    "INNER",
    "INSERT",
    "INTO",
    "IS",
    "JOIN",
    "KEY",
    "LEFT",
    "LIKE",
    "LIMIT",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "PRIMARY",
    "REFERENCES",
    "RIGHT",
    "SELECT",
    "SET",
    "TABLE",
    "THEN",
    "TO",
    "TRUE",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "USER",
    "USING",
    "VALUES",
    "WHEN",
    "WHERE",
    "WITH",
];

static IDENTIFIER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// Check whether a name is a reserved keyword in any supported dialect
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name.to_uppercase().as_str())
}

/// Validate a table or column name
///
/// Rules:
/// - Must start with a letter or underscore
/// - Can only contain ASCII letters, digits and underscores
/// - Cannot be a reserved keyword of any supported dialect (case-insensitive)
///
/// # Example
/// ```
/// use metasql::sql::validate_identifier;
///
/// assert!(validate_identifier("accounts").is_ok());
/// assert!(validate_identifier("CreatedAt").is_ok());
/// assert!(validate_identifier("user-data").is_err());
/// assert!(validate_identifier("order").is_err()); // reserved keyword
/// ```
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    let re = IDENTIFIER.as_ref().map_err(|e| e.to_string())?;
    if !re.is_match(name) {
        return Err(format!(
            "Identifier '{}' is invalid. Must start with a letter or underscore and contain only letters, numbers, and underscores.",
            name
        ));
    }

    if is_reserved(name) {
        return Err(format!(
            "Identifier '{}' is a reserved SQL keyword and cannot be used unquoted",
            name
        ));
    }

    Ok(())
}

/// Quote an identifier with the dialect's quote character, escaping embedded quotes
pub fn quote_identifier(dialect: Dialect, identifier: &str) -> String {
    let q = dialect.quote_char();
    let escaped = identifier.replace(q, &format!("{}{}", q, q));
    format!("{}{}{}", q, escaped, q)
}

/// Quote only when the identifier collides with a reserved word
pub fn quote_if_reserved(dialect: Dialect, identifier: &str) -> String {
    if is_reserved(identifier) {
        quote_identifier(dialect, identifier)
    } else {
        identifier.to_string()
    }
}
