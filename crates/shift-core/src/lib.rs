//! Shared types for the soundshift rule compiler.
//!
//! - [`token`] -- Rule-file tokens and source positions
//! - [`character`] -- Character classes and the diacritic/modifier range
//! - [`symbol`] -- Transducer input symbols, including the boundary sentinels
//! - [`ast`] -- Syntax tree of rule files

pub mod ast;
pub mod character;
pub mod symbol;
pub mod token;
