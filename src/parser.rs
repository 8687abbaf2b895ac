//! Statement-block parsing.
//!
//! A statement file is a sequence of blocks separated by a delimiter
//! (`--` by default). Each block is a name line followed by the statement
//! body:
//!
//! ```text
//! -- get_user
//! SELECT * FROM users WHERE id = $1;
//! -- list_users
//! SELECT * FROM users;
//! ```
//!
//! The delimiter is a plain separator and is not interpreted as a SQL
//! comment, so a body must not contain it.

/// A named statement parsed from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub text: String,
}

impl Statement {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Split `content` into statements.
///
/// Blocks that are empty, have no newline, or trim to an empty name or
/// body are skipped. Statements come back in file order; duplicates are
/// kept so the caller decides how to resolve them.
pub fn parse_statements(content: &str, delimiter: &str) -> Vec<Statement> {
    if delimiter.is_empty() {
        return parse_block(content).into_iter().collect();
    }
    content.split(delimiter).filter_map(parse_block).collect()
}

fn parse_block(block: &str) -> Option<Statement> {
    let block = block.trim();
    if block.is_empty() {
        return None;
    }
    let (name, text) = block.split_once('\n')?;
    let (name, text) = (name.trim(), text.trim());
    if name.is_empty() || text.is_empty() {
        return None;
    }
    Some(Statement::new(name, text))
}
