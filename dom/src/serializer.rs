//! HTML serialization: `spec.md` §4.8. Walks an [`crate::arena::Arena`]
//! tree and drives a [`webparse_core::serialize::Serializer`].
//!
//! Grounded in `html5ever`/`xml5ever`'s `serialize::Serializer` shape
//! (`write_to_buf_escaped`, the `ignore_children`/void-element handling in
//! the pre-2018 `src/serialize/mod.rs`, and `markup5ever_rcdom`'s
//! `SerializeOp` open/close worklist) adapted to this crate's
//! `core::serialize` traits and arena node representation.

use std::collections::VecDeque;
use std::io::{self, Write};

use webparse_core::atom::TagName;
use webparse_core::serialize::{AttrRef, Serialize, Serializer, TraversalScope};

use crate::arena::{Arena, NodeData, NodeId};

/// Void elements never emit a closing tag. <https://html.spec.whatwg.org/multipage/syntax.html#void-elements>
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is never escaped on the way out.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

fn escape(out: &mut impl Write, text: &str, attr_mode: bool) -> io::Result<()> {
    for c in text.chars() {
        match c {
            '&' => out.write_all(b"&amp;"),
            '\u{00A0}' => out.write_all(b"&nbsp;"),
            '"' if attr_mode => out.write_all(b"&quot;"),
            '<' if !attr_mode => out.write_all(b"&lt;"),
            '>' if !attr_mode => out.write_all(b"&gt;"),
            c => {
                let mut buf = [0u8; 4];
                out.write_all(c.encode_utf8(&mut buf).as_bytes())
            }
        }?;
    }
    Ok(())
}

/// An HTML text serializer writing to any [`Write`].
pub struct HtmlSerializer<W: Write> {
    writer: W,
    /// Whether the currently-open element (if any) is one whose text
    /// content is never escaped, per a stack mirroring the open-element
    /// nesting `start_elem`/`end_elem` walk through.
    open_raw_text: Vec<bool>,
}

impl<W: Write> HtmlSerializer<W> {
    pub fn new(writer: W) -> Self {
        HtmlSerializer { writer, open_raw_text: Vec::new() }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Serializer for HtmlSerializer<W> {
    fn start_elem<'a, I>(&mut self, name: &TagName, attrs: I) -> io::Result<()>
    where
        I: Iterator<Item = AttrRef<'a>>,
    {
        self.writer.write_all(b"<")?;
        self.writer.write_all(name.as_str().as_bytes())?;
        for (attr_name, value) in attrs {
            self.writer.write_all(b" ")?;
            self.writer.write_all(attr_name.local.as_str().as_bytes())?;
            self.writer.write_all(b"=\"")?;
            escape(&mut self.writer, value, true)?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(b">")?;
        self.open_raw_text.push(RAW_TEXT_ELEMENTS.contains(&name.as_str()));
        Ok(())
    }

    fn end_elem(&mut self, name: &TagName) -> io::Result<()> {
        self.open_raw_text.pop();
        if VOID_ELEMENTS.contains(&name.as_str()) {
            return Ok(());
        }
        self.writer.write_all(b"</")?;
        self.writer.write_all(name.as_str().as_bytes())?;
        self.writer.write_all(b">")
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if self.open_raw_text.last().copied().unwrap_or(false) {
            self.writer.write_all(text.as_bytes())
        } else {
            escape(&mut self.writer, text, false)
        }
    }

    fn write_comment(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(b"<!--")?;
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"-->")
    }

    fn write_doctype(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> io::Result<()> {
        self.writer.write_all(b"<!DOCTYPE ")?;
        self.writer.write_all(name.as_bytes())?;
        if let Some(public_id) = public_id.filter(|s| !s.is_empty()) {
            self.writer.write_all(b" PUBLIC \"")?;
            self.writer.write_all(public_id.as_bytes())?;
            self.writer.write_all(b"\"")?;
        }
        if let Some(system_id) = system_id.filter(|s| !s.is_empty()) {
            self.writer.write_all(b" \"")?;
            self.writer.write_all(system_id.as_bytes())?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(b">")
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()> {
        self.writer.write_all(b"<?")?;
        self.writer.write_all(target.as_bytes())?;
        self.writer.write_all(b" ")?;
        self.writer.write_all(data.as_bytes())?;
        self.writer.write_all(b">")
    }
}

enum Op {
    Open(NodeId),
    Close(TagName),
}

/// A view into an [`Arena`] at a particular node, ready to serialize.
/// Mirrors `markup5ever_rcdom::SerializableHandle`'s open/close worklist
/// walk, adapted to pull children from the arena instead of an `Rc` list.
pub struct SerializableNode<'a> {
    pub arena: &'a Arena,
    pub node: NodeId,
}

impl<'a> Serialize for SerializableNode<'a> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()> {
        let mut ops = VecDeque::new();
        match scope {
            TraversalScope::IncludeNode => ops.push_back(Op::Open(self.node)),
            TraversalScope::ChildrenOnly => ops.extend(self.arena.children(self.node).map(Op::Open)),
        }

        while let Some(op) = ops.pop_front() {
            match op {
                Op::Open(node) => match self.arena.data(node) {
                    NodeData::Element { name, attrs, .. } => {
                        serializer.start_elem(name, attrs.iter().map(|a| (&a.name, &*a.value)))?;
                        ops.push_front(Op::Close(name.clone()));
                        for child in self.arena.children(node).collect::<Vec<_>>().into_iter().rev() {
                            ops.push_front(Op::Open(child));
                        }
                    }
                    NodeData::Doctype { name, public_id, system_id } => {
                        let public_id = (!public_id.is_empty()).then(|| &**public_id);
                        let system_id = (!system_id.is_empty()).then(|| &**system_id);
                        serializer.write_doctype(name, public_id, system_id)?;
                    }
                    NodeData::Text { contents } => serializer.write_text(contents)?,
                    NodeData::Comment { contents } => serializer.write_comment(contents)?,
                    NodeData::Document { .. } | NodeData::DocumentFragment => {
                        for child in self.arena.children(node).collect::<Vec<_>>().into_iter().rev() {
                            ops.push_front(Op::Open(child));
                        }
                    }
                },
                Op::Close(name) => serializer.end_elem(&name)?,
            }
        }
        Ok(())
    }
}

/// Serializes `node` (including itself) as an HTML string.
pub fn serialize_to_string(arena: &Arena, node: NodeId) -> io::Result<String> {
    let mut ser = HtmlSerializer::new(Vec::new());
    SerializableNode { arena, node }.serialize(&mut ser, TraversalScope::IncludeNode)?;
    Ok(String::from_utf8(ser.into_inner()).expect("serializer only ever writes UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendril::StrTendril;
    use webparse_core::atom::{AttrName, TagName as Tag};
    use webparse_core::namespace::Namespace;
    use webparse_core::qualname::{Attribute, QualName};

    #[test]
    fn void_element_has_no_end_tag() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let br = arena.create(NodeData::Element {
            ns: Namespace::Html,
            name: Tag::new(StrTendril::from("br")),
            attrs: vec![],
            template: false,
            mathml_annotation_xml_integration_point: false,
        });
        arena.append(doc, br);
        let out = serialize_to_string(&arena, doc).unwrap();
        assert_eq!(out, "<br>");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(NodeData::Element {
            ns: Namespace::Html,
            name: Tag::new(StrTendril::from("a")),
            attrs: vec![Attribute {
                name: QualName::attr(AttrName::new(StrTendril::from("title"))),
                value: StrTendril::from("a \"b\" & c"),
            }],
            template: false,
            mathml_annotation_xml_integration_point: false,
        });
        arena.append(doc, a);
        let out = serialize_to_string(&arena, doc).unwrap();
        assert_eq!(out, r#"<a title="a &quot;b&quot; &amp; c"></a>"#);
    }

    #[test]
    fn script_text_is_not_escaped() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let script = arena.create(NodeData::Element {
            ns: Namespace::Html,
            name: Tag::new(StrTendril::from("script")),
            attrs: vec![],
            template: false,
            mathml_annotation_xml_integration_point: false,
        });
        arena.append(doc, script);
        let text = arena.create(NodeData::Text { contents: StrTendril::from("if (a < b) {}") });
        arena.append(script, text);
        let out = serialize_to_string(&arena, doc).unwrap();
        assert_eq!(out, "<script>if (a < b) {}</script>");
    }

    #[test]
    fn doctype_with_no_ids_is_bare() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let doctype = arena.create(NodeData::Doctype {
            name: StrTendril::from("html"),
            public_id: StrTendril::new(),
            system_id: StrTendril::new(),
        });
        arena.append(doc, doctype);
        let out = serialize_to_string(&arena, doc).unwrap();
        assert_eq!(out, "<!DOCTYPE html>");
    }
}
