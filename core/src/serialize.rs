//! Serialization traits: a `Serialize` impl walks some tree shape and drives
//! a `Serializer`, which knows how to turn that walk into bytes (HTML text,
//! in `webparse-dom`; nothing stops a caller writing another backend).
//!
//! Grounded in `markup5ever::serialize`.

use std::io;

use crate::atom::TagName;
use crate::qualname::QualName;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TraversalScope {
    IncludeNode,
    ChildrenOnly,
}

pub trait Serialize {
    fn serialize<S: Serializer>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()>;
}

pub type AttrRef<'a> = (&'a QualName, &'a str);

pub trait Serializer {
    fn start_elem<'a, I>(&mut self, name: &TagName, attrs: I) -> io::Result<()>
    where
        I: Iterator<Item = AttrRef<'a>>;

    fn end_elem(&mut self, name: &TagName) -> io::Result<()>;

    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn write_comment(&mut self, text: &str) -> io::Result<()>;

    fn write_doctype(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> io::Result<()>;

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()>;
}
