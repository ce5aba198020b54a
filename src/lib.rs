//! lexforge: reads a POSIX lex/flex-dialect `.l` source file and emits a
//! self-contained Rust scanner program.
//!
//! The pipeline is three stages, each a module here: [`parser`] turns `.l`
//! source text into a [`model::LexFile`]; [`parser::action`] (invoked by the
//! emitter, one rule at a time) rewrites each rule's action body from lex
//! conventions into plain Rust; [`emit`] serializes the populated model, plus
//! the fixed runtime template, into the final scanner source.

pub mod emit;
pub mod error;
pub mod model;
pub mod parser;

pub use error::{LexForgeError, Result};
pub use model::LexFile;
