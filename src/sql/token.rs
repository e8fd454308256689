//! SQL Token definitions
//!
//! This module defines all tokens that can appear in statements.

use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Table,
    Tables,
    Show,

    // DML Keywords
    Select,
    Insert,
    Update,
    Delete,
    Into,
    Values,
    Set,
    From,
    Where,

    // Clauses
    And,
    Or,
    Not,
    On,
    Join,
    Inner,
    Left,
    Right,
    Outer,

    // Constraints
    Primary,
    Foreign,
    Key,
    References,
    Unique,
    Null,
    Cascade,
    Restrict,

    // Boolean Literals
    True,
    False,

    // Transactions
    Begin,
    Commit,
    Rollback,
    Transaction,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Double-quoted text: an identifier in name positions, a string in value positions
    QuotedLiteral(String),
    /// Identifier (table name, column name, type name)
    Identifier(String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// *
    Asterisk,
    /// ->
    Arrow,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Create
                | Token::Drop
                | Token::Table
                | Token::Tables
                | Token::Show
                | Token::Select
                | Token::Insert
                | Token::Update
                | Token::Delete
                | Token::Into
                | Token::Values
                | Token::Set
                | Token::From
                | Token::Where
                | Token::And
                | Token::Or
                | Token::Not
                | Token::On
                | Token::Join
                | Token::Inner
                | Token::Left
                | Token::Right
                | Token::Outer
                | Token::Primary
                | Token::Foreign
                | Token::Key
                | Token::References
                | Token::Unique
                | Token::Null
                | Token::Cascade
                | Token::Restrict
                | Token::True
                | Token::False
                | Token::Begin
                | Token::Commit
                | Token::Rollback
                | Token::Transaction
        )
    }

    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            // DDL
            "CREATE" => Some(Token::Create),
            "DROP" => Some(Token::Drop),
            "TABLE" => Some(Token::Table),
            "TABLES" => Some(Token::Tables),
            "SHOW" => Some(Token::Show),

            // DML
            "SELECT" => Some(Token::Select),
            "INSERT" => Some(Token::Insert),
            "UPDATE" => Some(Token::Update),
            "DELETE" => Some(Token::Delete),
            "INTO" => Some(Token::Into),
            "VALUES" => Some(Token::Values),
            "SET" => Some(Token::Set),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),

            // Clauses
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            "ON" => Some(Token::On),
            "JOIN" => Some(Token::Join),
            "INNER" => Some(Token::Inner),
            "LEFT" => Some(Token::Left),
            "RIGHT" => Some(Token::Right),
            "OUTER" => Some(Token::Outer),

            // Constraints
            "PRIMARY" => Some(Token::Primary),
            "FOREIGN" => Some(Token::Foreign),
            "KEY" => Some(Token::Key),
            "REFERENCES" => Some(Token::References),
            "UNIQUE" => Some(Token::Unique),
            "NULL" => Some(Token::Null),
            "CASCADE" => Some(Token::Cascade),
            "RESTRICT" => Some(Token::Restrict),

            // Boolean Literals
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),

            // Transactions
            "BEGIN" => Some(Token::Begin),
            "COMMIT" => Some(Token::Commit),
            "ROLLBACK" => Some(Token::Rollback),
            "TRANSACTION" => Some(Token::Transaction),

            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Create => write!(f, "CREATE"),
            Token::Drop => write!(f, "DROP"),
            Token::Table => write!(f, "TABLE"),
            Token::Tables => write!(f, "TABLES"),
            Token::Show => write!(f, "SHOW"),
            Token::Select => write!(f, "SELECT"),
            Token::Insert => write!(f, "INSERT"),
            Token::Update => write!(f, "UPDATE"),
            Token::Delete => write!(f, "DELETE"),
            Token::Into => write!(f, "INTO"),
            Token::Values => write!(f, "VALUES"),
            Token::Set => write!(f, "SET"),
            Token::From => write!(f, "FROM"),
            Token::Where => write!(f, "WHERE"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::On => write!(f, "ON"),
            Token::Join => write!(f, "JOIN"),
            Token::Inner => write!(f, "INNER"),
            Token::Left => write!(f, "LEFT"),
            Token::Right => write!(f, "RIGHT"),
            Token::Outer => write!(f, "OUTER"),
            Token::Primary => write!(f, "PRIMARY"),
            Token::Foreign => write!(f, "FOREIGN"),
            Token::Key => write!(f, "KEY"),
            Token::References => write!(f, "REFERENCES"),
            Token::Unique => write!(f, "UNIQUE"),
            Token::Null => write!(f, "NULL"),
            Token::Cascade => write!(f, "CASCADE"),
            Token::Restrict => write!(f, "RESTRICT"),
            Token::True => write!(f, "TRUE"),
            Token::False => write!(f, "FALSE"),
            Token::Begin => write!(f, "BEGIN"),
            Token::Commit => write!(f, "COMMIT"),
            Token::Rollback => write!(f, "ROLLBACK"),
            Token::Transaction => write!(f, "TRANSACTION"),
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::QuotedLiteral(s) => write!(f, "\"{}\"", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Asterisk => write!(f, "*"),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with the character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: usize,
}

impl SpannedToken {
    pub fn new(token: Token, position: usize) -> Self {
        Self { token, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(Token::from_keyword("SELECT"), Some(Token::Select));
        assert_eq!(Token::from_keyword("select"), Some(Token::Select));
        assert_eq!(Token::from_keyword("CaScAdE"), Some(Token::Cascade));
        assert_eq!(Token::from_keyword("integer"), None);
        assert_eq!(Token::from_keyword("unknown"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(Token::Select.is_keyword());
        assert!(Token::Show.is_keyword());
        assert!(!Token::Arrow.is_keyword());
        assert!(!Token::IntegerLiteral(42).is_keyword());
    }
}
