//! Shared plumbing for `webparse-html`: atoms, the buffer queue, the decode
//! pipeline, the named-character-reference matcher and the serialization
//! traits. Split out the same way the teacher splits `markup5ever` from
//! `html5ever`: anything the tokenizer and the tree constructor both need
//! to agree on lives here.

pub mod atom;
pub mod buffer_queue;
pub mod encoding;
pub mod entities;
pub mod error;
pub mod namespace;
pub mod qualname;
pub mod serialize;
pub mod small_char_set;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}

pub use atom::{AttrName, Atom, TagName};
pub use error::ParserError;
pub use namespace::Namespace;
pub use qualname::{Attribute, ExpandedName, QualName};

pub use tendril;
