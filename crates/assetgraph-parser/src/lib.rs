//! Asset definition parsing and static reference extraction
//!
//! This crate handles:
//! - Parsing one asset definition file into an `AssetDefinition` with a content hash
//! - Lexical extraction of upstream references and column names from transform text
//! - Normalizing a definition into an `Ast` (canonical blocks, schema, tests, dependencies)

pub mod ast;
pub mod definition;
pub mod error;
pub mod extractor;

pub use ast::{Ast, AstGenerator};
pub use definition::{content_hash, AssetDefinition, DefinitionParser};
pub use error::DefinitionError;
pub use extractor::{Extraction, LexicalExtractor, ReferenceExtractor};
