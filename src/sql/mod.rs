//! SQL front end
//!
//! This module contains the lexer, the parser and the AST for the
//! statement dialect accepted by [`crate::Database::execute`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::{parse, Parser};
pub use token::{SpannedToken, Token};
