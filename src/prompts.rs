//! Canned conversation starters offered next to the gateway operations.
//!
//! Prompts never touch the database; they only render a short message list
//! that a client can seed a conversation with.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    fn user(content: impl Into<String>) -> Self {
        PromptMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        PromptMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Offers help building a query against one table.
pub fn help_build_query(table_name: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::assistant(format!(
            "I see you are working with the table {}. How can I help you build your query?",
            table_name
        )),
        PromptMessage::user("I would like to filter the data by..."),
        PromptMessage::assistant("I can help with that. Which fields do you want to filter on?"),
    ]
}

/// Suggests ways to explore the rows of one table.
pub fn explore_data(table_name: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::assistant(format!("Let's explore the data in the table {} together.", table_name)),
        PromptMessage::assistant(
            "Would you like to see:\n- The first rows\n- Descriptive statistics\n- The distribution of values\n- Correlations between columns?",
        ),
    ]
}

pub fn use_database_schema() -> Vec<PromptMessage> {
    vec![
        PromptMessage::user("Use the list_tables operation to explore the database schema"),
        PromptMessage::assistant("I can help you explore your database. Would you like to see the list of available tables?"),
    ]
}
