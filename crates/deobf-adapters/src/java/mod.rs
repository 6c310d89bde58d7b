//! Análisis léxico mínimo de fuentes Java.

mod lexer;

pub use lexer::{tokenize, Token, TokenKind};
