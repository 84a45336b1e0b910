//! Contains the supporting logic needed for applications that use YARPG-generated parsers.
//!
//! Generated code owns the tables (as flat `static` arrays) and the reduce actions.  This crate
//! interprets the tables: [`ParserState`] is a push parser, driven one token at a time, and
//! [`Scanner`] cuts input text into tokens using the lexer tables.

#![warn(rust_2018_idioms)]

mod parser;
mod scanner;

pub use crate::parser::{ParserState, ParserTables, PushResult};
pub use crate::scanner::{LexerTables, Scanner, Token, EOF};

#[cfg(feature = "yarpg_log")]
#[doc(hidden)]
pub use log as __log;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("syntax error in state {state} at terminal {terminal}")]
    SyntaxError { state: usize, terminal: usize },

    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { offset: usize, ch: char },

    #[error("the parser was pushed a token after it accepted")]
    AlreadyAccepted,

    #[error("malformed parse tables: {0}")]
    BadTables(&'static str),
}

#[cfg(feature = "yarpg_log")]
#[macro_export]
macro_rules! yarpg_log {
    (
        $($t:tt)*
    ) => {
        $crate::__log::debug!( $($t)* )
    }
}

#[cfg(not(feature = "yarpg_log"))]
#[macro_export]
macro_rules! yarpg_log {
    (
        $($t:tt)*
    ) => {
        // nothing
    };
}
