//! SQL lexer.
//!
//! Produces the token stream shared by the clause splitter and the
//! expression parser.

mod token;
mod tokenizer;

pub use token::{Keyword, Span, Token, TokenKind};
pub use tokenizer::Lexer;
