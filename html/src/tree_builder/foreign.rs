//! Foreign content: detecting when the adjusted current node is in the
//! SVG/MathML namespace, and the attribute/tag-name adjustments applied
//! when inserting foreign elements.
//!
//! Grounded in `html5ever::tree_builder::mod`'s `is_foreign`/`enter_foreign`
//! /`adjust_*_attributes`/`foreign_start_tag`/`unexpected_start_tag_in_foreign_content`.
//! The SVG tag/attribute spelling tables live in `webparse_core::atom`
//! (`adjust_svg_tag_name`/`adjust_svg_attr_name`); the foreign-attribute
//! namespace table (`xlink:*`/`xml:*`/`xmlns*`) is local to this module
//! since it produces `QualName`s, not bare atoms.

use tendril::StrTendril;
use webparse_core::atom::{AttrName, TagName};
use webparse_core::namespace::Namespace;
use webparse_core::qualname::{Attribute, QualName};

use crate::interface::TreeSink;
use crate::tokenizer::{Tag, TagKind};

use super::types::{ProcessResult, Token};
use super::TreeBuilder;

fn mathml_text_integration_point(ns: Namespace, name: &str) -> bool {
    ns == Namespace::MathMl && matches!(name, "mi" | "mo" | "mn" | "ms" | "mtext")
}

fn svg_html_integration_point(ns: Namespace, name: &str) -> bool {
    ns == Namespace::Svg && matches!(name, "foreignObject" | "desc" | "title")
}

/// <https://html.spec.whatwg.org/multipage/parsing.html#adjust-foreign-attributes>
fn foreign_attribute_adjustment(name: &str) -> Option<QualName> {
    let (prefix, ns, local): (Option<&str>, Namespace, &str) = match name {
        "xlink:actuate" => (Some("xlink"), Namespace::XLink, "actuate"),
        "xlink:arcrole" => (Some("xlink"), Namespace::XLink, "arcrole"),
        "xlink:href" => (Some("xlink"), Namespace::XLink, "href"),
        "xlink:role" => (Some("xlink"), Namespace::XLink, "role"),
        "xlink:show" => (Some("xlink"), Namespace::XLink, "show"),
        "xlink:title" => (Some("xlink"), Namespace::XLink, "title"),
        "xlink:type" => (Some("xlink"), Namespace::XLink, "type"),
        "xml:lang" => (Some("xml"), Namespace::Xml, "lang"),
        "xml:space" => (Some("xml"), Namespace::Xml, "space"),
        "xmlns" => (None, Namespace::XmlNs, "xmlns"),
        "xmlns:xlink" => (Some("xmlns"), Namespace::XmlNs, "xlink"),
        _ => return None,
    };
    Some(QualName::new(
        prefix.map(StrTendril::from_slice),
        ns,
        AttrName::new(StrTendril::from_slice(local)),
    ))
}

fn adjust_attributes<F: Fn(&str) -> Option<QualName>>(tag: &mut Tag, map: F) {
    for attr in &mut tag.attrs {
        if let Some(replacement) = map(attr.name.local.as_str()) {
            attr.name = replacement;
        }
    }
}

pub(super) fn adjust_mathml_attributes(tag: &mut Tag) {
    adjust_attributes(tag, |k| match k {
        "definitionurl" => Some(QualName::attr(AttrName::new(StrTendril::from_slice("definitionURL")))),
        _ => None,
    });
}

pub(super) fn adjust_svg_attributes(tag: &mut Tag) {
    adjust_attributes(tag, |k| {
        webparse_core::atom::adjust_svg_attr_name(k)
            .map(|canon| QualName::attr(AttrName::new(StrTendril::from_slice(canon))))
    });
}

pub(super) fn adjust_foreign_attributes(tag: &mut Tag) {
    adjust_attributes(tag, foreign_attribute_adjustment);
}

fn adjust_svg_tag_name(tag: &mut Tag) {
    if let Some(canon) = webparse_core::atom::adjust_svg_tag_name(tag.name.as_str()) {
        tag.name = TagName::new(StrTendril::from_slice(canon));
    }
}

impl<Sink> TreeBuilder<Sink>
where
    Sink: TreeSink,
    Sink::Handle: Clone + PartialEq,
{
    /// <https://html.spec.whatwg.org/multipage/parsing.html#tree-construction-dispatcher>
    pub(crate) fn is_foreign(&self, token: &Token) -> bool {
        if matches!(token, Token::Eof) {
            return false;
        }
        if self.open_elems_is_empty() {
            return false;
        }

        let current = self.adjusted_current_node();
        let (ns, name) = self.sink.elem_name(&current);
        if ns == Namespace::Html {
            return false;
        }
        let name = name.as_str().to_string();

        if mathml_text_integration_point(ns, &name) {
            match token {
                Token::Characters(..) | Token::NullCharacter => return false,
                Token::Tag(Tag { kind: TagKind::StartTag, name: tn, .. })
                    if !matches!(tn.as_str(), "mglyph" | "malignmark") =>
                {
                    return false;
                }
                _ => {}
            }
        }

        if svg_html_integration_point(ns, &name) {
            match token {
                Token::Characters(..) | Token::NullCharacter => return false,
                Token::Tag(Tag { kind: TagKind::StartTag, .. }) => return false,
                _ => {}
            }
        }

        if ns == Namespace::MathMl && name == "annotation-xml" {
            match token {
                Token::Tag(Tag { kind: TagKind::StartTag, name: tn, .. }) if tn.as_str() == "svg" => return false,
                Token::Characters(..) | Token::NullCharacter | Token::Tag(Tag { kind: TagKind::StartTag, .. }) => {
                    return !self.sink.is_mathml_annotation_xml_integration_point(&current);
                }
                _ => {}
            }
        }

        true
    }

    fn open_elems_is_empty(&self) -> bool {
        self.open_elems_len() == 0
    }

    pub(crate) fn step_foreign(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::NullCharacter => {
                self.sink.parse_error(std::borrow::Cow::from("Unexpected null character"));
                self.append_text(StrTendril::from_slice("\u{FFFD}"))
            }
            Token::Characters(_, text) => {
                if text.chars().any(|c| !c.is_ascii_whitespace()) {
                    self.frameset_not_ok();
                }
                self.append_text(text)
            }
            Token::Comment(text) => self.append_comment(text),
            Token::Tag(tag) if tag.kind == TagKind::StartTag => self.start_tag_in_foreign(tag),
            Token::Tag(tag) => self.end_tag_in_foreign(tag),
            Token::Eof => self.unexpected(&"eof in foreign content"),
        }
    }

    fn start_tag_in_foreign(&self, tag: Tag) -> ProcessResult<Sink::Handle> {
        const BREAKOUT: &[&str] = &[
            "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em",
            "embed", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing",
            "menu", "meta", "nobr", "ol", "p", "pre", "ruby", "s", "small", "span", "strong",
            "strike", "sub", "sup", "table", "tt", "u", "ul", "var",
        ];
        let unexpected_font =
            tag.name.as_str() == "font" && tag.attrs.iter().any(|a| matches!(a.name.local.as_str(), "color" | "face" | "size"));
        if BREAKOUT.contains(&tag.name.as_str()) || unexpected_font {
            self.unexpected_start_tag_in_foreign_content(tag)
        } else {
            self.foreign_start_tag(tag)
        }
    }

    fn foreign_start_tag(&self, mut tag: Tag) -> ProcessResult<Sink::Handle> {
        let (current_ns, _) = self.sink.elem_name(&self.adjusted_current_node());
        match current_ns {
            Namespace::MathMl => adjust_mathml_attributes(&mut tag),
            Namespace::Svg => {
                adjust_svg_tag_name(&mut tag);
                adjust_svg_attributes(&mut tag);
            }
            _ => {}
        }
        adjust_foreign_attributes(&mut tag);
        if tag.self_closing {
            self.insert_element(false, current_ns, tag.name, tag.attrs);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element(true, current_ns, tag.name, tag.attrs);
            ProcessResult::Done
        }
    }

    fn unexpected_start_tag_in_foreign_content(&self, tag: Tag) -> ProcessResult<Sink::Handle> {
        self.unexpected(&tag);
        loop {
            let (ns, name) = {
                let current = self.current_node();
                self.sink.elem_name(&current)
            };
            let name = name.as_str().to_string();
            if ns == Namespace::Html || mathml_text_integration_point(ns, &name) || svg_html_integration_point(ns, &name) {
                break;
            }
            self.open_elems_pop();
        }
        self.step(self.mode_get(), Token::Tag(tag))
    }

    fn end_tag_in_foreign(&self, tag: Tag) -> ProcessResult<Sink::Handle> {
        let len = self.open_elems_len();
        if len == 0 {
            return ProcessResult::Done;
        }
        let mut stack_idx = len - 1;
        let mut first = true;
        loop {
            if stack_idx == 0 {
                return ProcessResult::Done;
            }
            let (html, eq) = {
                let handle = self.open_elems_handle_at(stack_idx);
                let (ns, name) = self.sink.elem_name(&handle);
                (ns == Namespace::Html, name.as_str().eq_ignore_ascii_case(tag.name.as_str()))
            };
            if !first && html {
                return self.step(self.mode_get(), Token::Tag(tag));
            }
            if eq {
                self.open_elems_truncate(stack_idx);
                return ProcessResult::Done;
            }
            if first {
                self.unexpected(&tag);
                first = false;
            }
            stack_idx -= 1;
        }
    }
}

// Small accessors kept private to this module so `mod.rs` doesn't need to
// expose `open_elems`'s `RefCell` borrow pattern outside the struct impl.
impl<Sink> TreeBuilder<Sink>
where
    Sink: TreeSink,
    Sink::Handle: Clone + PartialEq,
{
    fn open_elems_len(&self) -> usize {
        self.open_elems_len_impl()
    }
    fn open_elems_pop(&self) {
        self.open_elems_pop_impl();
    }
    fn open_elems_truncate(&self, len: usize) {
        self.open_elems_truncate_impl(len);
    }
    fn open_elems_handle_at(&self, index: usize) -> Sink::Handle {
        self.open_elems_handle_at_impl(index)
    }
    fn mode_get(&self) -> super::InsertionMode {
        self.mode_get_impl()
    }
    fn frameset_not_ok(&self) {
        self.frameset_not_ok_impl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_with_attr(name: &str) -> Tag {
        Tag {
            kind: TagKind::StartTag,
            name: TagName::new(StrTendril::from_slice(name)),
            self_closing: false,
            attrs: vec![Attribute { name: QualName::attr(AttrName::new(StrTendril::from_slice(name))), value: StrTendril::from_slice("x") }],
        }
    }

    #[test]
    fn mathml_definitionurl_is_recased() {
        let mut tag = tag_with_attr("definitionurl");
        adjust_mathml_attributes(&mut tag);
        assert_eq!(tag.attrs[0].name.local.as_str(), "definitionURL");
    }

    #[test]
    fn svg_attr_viewbox_is_recased() {
        let mut tag = tag_with_attr("viewbox");
        adjust_svg_attributes(&mut tag);
        assert_eq!(tag.attrs[0].name.local.as_str(), "viewBox");
    }

    #[test]
    fn xlink_href_gets_the_xlink_namespace_and_prefix() {
        let mut tag = tag_with_attr("xlink:href");
        adjust_foreign_attributes(&mut tag);
        let attr = &tag.attrs[0];
        assert_eq!(attr.name.ns, Namespace::XLink);
        assert_eq!(attr.name.local.as_str(), "href");
        assert_eq!(attr.name.prefix.as_deref(), Some("xlink"));
    }

    #[test]
    fn unrelated_attribute_names_are_left_alone() {
        let mut tag = tag_with_attr("class");
        adjust_mathml_attributes(&mut tag);
        adjust_svg_attributes(&mut tag);
        adjust_foreign_attributes(&mut tag);
        assert_eq!(tag.attrs[0].name.local.as_str(), "class");
        assert_eq!(tag.attrs[0].name.ns, Namespace::None);
    }
}
