/// Statement Guard Module
///
/// A cheap textual check run on every statement before a connection is
/// opened. It is not a SQL parser: it only pins the leading verb and
/// forbids the statement separator so a single text field cannot carry a
/// second, stacked statement.

use crate::core::db::driver::Value;
use crate::core::{GatewayError, Result};
use std::fmt;

/// Character that separates stacked statements.
pub const STATEMENT_SEPARATOR: char = ';';

/// Leading verbs accepted by the statement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Select,
    Insert,
    Update,
}

impl Verb {
    pub fn keyword(&self) -> &'static str {
        match self {
            Verb::Select => "select",
            Verb::Insert => "insert",
            Verb::Update => "update",
        }
    }

    /// Whether statements with this verb change data and need a commit.
    pub fn is_write(&self) -> bool {
        !matches!(self, Verb::Select)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword().to_uppercase())
    }
}

/// Statement text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            text: text.into(),
            params,
        }
    }
}

/// A statement that passed `StatementGuard::check` for a given verb.
///
/// Only the guard can build one, which is what lets the executor assume
/// the check already ran.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedStatement {
    statement: Statement,
    verb: Verb,
}

impl GuardedStatement {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }
}

/// Returns the leading token of a statement: the first run of alphanumeric
/// or underscore characters after leading whitespace.
///
/// Alphanumeric is Unicode-aware, so an identifier such as `selecté` is one
/// token and never matches the `select` verb.
pub fn leading_token(text: &str) -> &str {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

pub struct StatementGuard;

impl StatementGuard {
    /// Checks the statement's leading verb and rejects any separator.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` when the leading token is not
    /// `required` (case-insensitive) or when the text contains `;`.
    pub fn check(statement: Statement, required: Verb) -> Result<GuardedStatement> {
        let token = leading_token(&statement.text);
        if !token.eq_ignore_ascii_case(required.keyword()) {
            return Err(GatewayError::Validation(format!("Query must start with '{}'", required)));
        }

        if statement.text.contains(STATEMENT_SEPARATOR) {
            return Err(GatewayError::Validation(format!(
                "Query must not contain '{}'",
                STATEMENT_SEPARATOR
            )));
        }

        Ok(GuardedStatement {
            statement,
            verb: required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str, verb: Verb) -> Result<GuardedStatement> {
        StatementGuard::check(Statement::new(text, Vec::new()), verb)
    }

    #[test]
    fn test_leading_token() {
        assert_eq!(leading_token("  SELECT * FROM t"), "SELECT");
        assert_eq!(leading_token("\n\tinsert\ninto t"), "insert");
        assert_eq!(leading_token("select*from t"), "select");
        assert_eq!(leading_token("(select 1)"), "");
        assert_eq!(leading_token(""), "");
        assert_eq!(leading_token("SELECTé FROM t"), "SELECTé");
        assert_eq!(leading_token("insert_é2 x"), "insert_é2");
    }

    #[test]
    fn test_verb_followed_by_non_ascii_letter_is_rejected() {
        assert!(matches!(check("SELECTé FROM t", Verb::Select), Err(GatewayError::Validation(_))));
        assert!(matches!(check("updateñ t SET a = 1", Verb::Update), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_accepts_matching_verb_any_case() {
        assert!(check("SELECT id FROM Client", Verb::Select).is_ok());
        assert!(check("  select id FROM Client", Verb::Select).is_ok());
        assert!(check("Insert INTO Client(name) VALUES (?)", Verb::Insert).is_ok());
        assert!(check("uPdAtE Client SET name = ?", Verb::Update).is_ok());

        let guarded = check("UPDATE Client SET name = 'x'", Verb::Update).unwrap();
        assert_eq!(guarded.verb(), Verb::Update);
        assert_eq!(guarded.statement().text, "UPDATE Client SET name = 'x'");
    }

    #[test]
    fn test_rejects_wrong_verb() {
        for (text, verb) in [
            ("DELETE FROM Client", Verb::Select),
            ("SELECT * FROM Client", Verb::Insert),
            ("INSERT INTO Client VALUES (1)", Verb::Update),
            ("selection FROM Client", Verb::Select),
            ("", Verb::Select),
            ("   ", Verb::Insert),
            ("WITH x AS (SELECT 1) SELECT * FROM x", Verb::Select),
        ] {
            match check(text, verb) {
                Err(GatewayError::Validation(msg)) => assert!(msg.contains("must start with")),
                other => panic!("Expected Validation error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_rejects_separator_anywhere() {
        for text in [
            "SELECT * FROM Client; DROP TABLE Client",
            "SELECT * FROM Client;",
            "SELECT ';' AS semi",
            "SELECT 1 ;",
        ] {
            match check(text, Verb::Select) {
                Err(GatewayError::Validation(msg)) => assert!(msg.contains("must not contain")),
                other => panic!("Expected Validation error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_verb_properties() {
        assert_eq!(Verb::Select.to_string(), "SELECT");
        assert!(!Verb::Select.is_write());
        assert!(Verb::Insert.is_write());
        assert!(Verb::Update.is_write());
    }
}
