mod condition;
mod entity;
mod error;
mod format;
mod identifiers;
mod triple_row;

pub use condition::*;
pub use entity::*;
pub use error::*;
pub use format::*;
pub use identifiers::*;
pub use triple_row::*;

/// The language code used for values that are not language-tagged when no other default is
/// configured.
pub const DEFAULT_LANGCODE: &str = "en";

/// The text format assigned to long texts that are stored without a format.
pub const DEFAULT_TEXT_FORMAT: &str = "full_html";

// Re-export some oxrdf types.
pub use oxiri::{Iri, IriParseError};
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, GraphName, LanguageTagParseError, Literal, LiteralRef, NamedNode, NamedNodeRef,
    Quad, Subject, Term, TermRef, Triple, Variable,
};
