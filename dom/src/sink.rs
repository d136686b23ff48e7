//! `Dom`: a `TreeSink` implementation over [`crate::arena::Arena`].
//!
//! Grounded in `markup5ever_rcdom::RcDom`'s `TreeSink` impl for *what* each
//! method does; the storage operations it delegates to are the arena's
//! instead of `Rc`/`RefCell` mutation.

use std::borrow::Cow;
use std::cell::RefCell;

use tendril::StrTendril;
use webparse_core::atom::TagName;
use webparse_core::namespace::Namespace;
use webparse_core::qualname::Attribute;
use webparse_html::interface::{ElementFlags, NodeOrText, QuirksMode as SinkQuirksMode, TreeSink};

use crate::arena::{Arena, NodeData, NodeId, QuirksMode};

fn map_quirks_mode(mode: SinkQuirksMode) -> QuirksMode {
    match mode {
        SinkQuirksMode::Quirks => QuirksMode::Quirks,
        SinkQuirksMode::LimitedQuirks => QuirksMode::LimitedQuirks,
        SinkQuirksMode::NoQuirks => QuirksMode::NoQuirks,
    }
}

/// The DOM produced by a parse: an [`Arena`] plus the bookkeeping a
/// `TreeSink` needs (quirks mode, collected parse errors). `RefCell`-wrapped
/// so `TreeBuilder<Sink>`, which only ever holds `&Sink`, can still mutate
/// the tree — mirroring the teacher's `RcDom`, whose `Node`s are `RefCell`
/// internally for the same reason.
pub struct Dom {
    arena: RefCell<Arena>,
    pub errors: RefCell<Vec<Cow<'static, str>>>,
    pub quirks_mode: RefCell<QuirksMode>,
}

impl Dom {
    pub fn new() -> Self {
        Dom {
            arena: RefCell::new(Arena::new()),
            errors: RefCell::new(Vec::new()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    pub fn document(&self) -> NodeId {
        self.arena.borrow().document()
    }

    pub fn quirks_mode(&self) -> QuirksMode {
        *self.quirks_mode.borrow()
    }

    /// Runs `f` with a shared borrow of the underlying arena, for callers
    /// (the serializer, tests) that want to walk the finished tree.
    pub fn with_arena<R>(&self, f: impl FnOnce(&Arena) -> R) -> R {
        f(&self.arena.borrow())
    }

    fn append_text_or_node(&self, parent: NodeId, child: NodeOrText<NodeId>) {
        let arena = &mut *self.arena.borrow_mut();
        if let NodeOrText::AppendText(text) = &child {
            if let Some(last) = arena.last_child(parent) {
                if append_to_text_node(arena, last, text) {
                    return;
                }
            }
        }
        let node = match child {
            NodeOrText::AppendText(text) => arena.create(NodeData::Text { contents: text }),
            NodeOrText::AppendNode(node) => node,
        };
        arena.append(parent, node);
    }
}

impl Default for Dom {
    fn default() -> Self {
        Dom::new()
    }
}

fn append_to_text_node(arena: &mut Arena, node: NodeId, text: &str) -> bool {
    match arena.data_mut(node) {
        NodeData::Text { contents } => {
            contents.push_slice(text);
            true
        }
        _ => false,
    }
}

impl TreeSink for Dom {
    type Handle = NodeId;

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> NodeId {
        self.document()
    }

    fn set_quirks_mode(&self, mode: SinkQuirksMode) {
        *self.quirks_mode.borrow_mut() = map_quirks_mode(mode);
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn elem_name(&self, target: &NodeId) -> (Namespace, TagName) {
        match self.arena.borrow().data(*target) {
            NodeData::Element { ns, name, .. } => (*ns, name.clone()),
            _ => panic!("elem_name called on a non-element node"),
        }
    }

    fn create_element(
        &self,
        ns: Namespace,
        name: TagName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> NodeId {
        self.arena.borrow_mut().create(NodeData::Element {
            ns,
            name,
            attrs,
            template: flags.template,
            mathml_annotation_xml_integration_point: flags.mathml_annotation_xml_integration_point,
        })
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.arena.borrow_mut().create(NodeData::Comment { contents: text })
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        self.append_text_or_node(*parent, child);
    }

    fn append_before_sibling(&self, sibling: &NodeId, new_node: NodeOrText<NodeId>) {
        let arena = &mut *self.arena.borrow_mut();
        let parent = arena.parent(*sibling).expect("append_before_sibling on a parentless node");
        if let NodeOrText::AppendText(text) = &new_node {
            if let Some(prev) = arena.prev_sibling(*sibling) {
                if append_to_text_node(arena, prev, text) {
                    return;
                }
            }
        }
        let node = match new_node {
            NodeOrText::AppendText(text) => arena.create(NodeData::Text { contents: text }),
            NodeOrText::AppendNode(node) => node,
        };
        let _ = parent;
        arena.insert_before(*sibling, node);
    }

    fn append_based_on_parent_node(&self, element: &NodeId, prev_element: &NodeId, child: NodeOrText<NodeId>) {
        let has_parent = self.arena.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let mut arena = self.arena.borrow_mut();
        let doc = arena.document();
        let doctype = arena.create(NodeData::Doctype { name, public_id, system_id });
        arena.append(doc, doctype);
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        match arena.data_mut(*target) {
            NodeData::Element { attrs: existing, .. } => {
                for attr in attrs {
                    if !existing.iter().any(|e| e.name == attr.name) {
                        existing.push(attr);
                    }
                }
            }
            _ => panic!("add_attrs_if_missing called on a non-element node"),
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        self.arena.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        self.arena.borrow_mut().move_children(*node, *new_parent);
    }

    fn mark_script_already_started(&self, _node: &NodeId) {}

    fn associate_with_form(&self, _target: &NodeId, _form: &NodeId) {}

    fn is_mathml_annotation_xml_integration_point(&self, handle: &NodeId) -> bool {
        matches!(
            self.arena.borrow().data(*handle),
            NodeData::Element { mathml_annotation_xml_integration_point: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webparse_core::atom::AttrName;
    use webparse_core::qualname::QualName;

    #[test]
    fn appending_adjacent_text_merges_into_one_node() {
        let dom = Dom::new();
        let doc = dom.get_document();
        dom.append(&doc, NodeOrText::AppendText(StrTendril::from("a")));
        dom.append(&doc, NodeOrText::AppendText(StrTendril::from("b")));
        dom.with_arena(|arena| {
            let children: Vec<_> = arena.children(doc).collect();
            assert_eq!(children.len(), 1);
            match arena.data(children[0]) {
                NodeData::Text { contents } => assert_eq!(&**contents, "ab"),
                _ => panic!("expected a merged text node"),
            }
        });
    }

    #[test]
    fn create_element_round_trips_attrs() {
        let dom = Dom::new();
        let attrs = vec![Attribute {
            name: QualName::attr(AttrName::new(StrTendril::from("href"))),
            value: StrTendril::from("/x"),
        }];
        let elem = dom.create_element(Namespace::Html, TagName::new(StrTendril::from("a")), attrs, ElementFlags::default());
        let (ns, name) = dom.elem_name(&elem);
        assert_eq!(ns, Namespace::Html);
        assert_eq!(name.as_str(), "a");
    }

    #[test]
    fn add_attrs_if_missing_does_not_overwrite_existing() {
        let dom = Dom::new();
        let elem = dom.create_element(
            Namespace::Html,
            TagName::new(StrTendril::from("a")),
            vec![Attribute {
                name: QualName::attr(AttrName::new(StrTendril::from("href"))),
                value: StrTendril::from("first"),
            }],
            ElementFlags::default(),
        );
        dom.add_attrs_if_missing(
            &elem,
            vec![Attribute {
                name: QualName::attr(AttrName::new(StrTendril::from("href"))),
                value: StrTendril::from("second"),
            }],
        );
        dom.with_arena(|arena| match arena.data(elem) {
            NodeData::Element { attrs, .. } => {
                assert_eq!(attrs.len(), 1);
                assert_eq!(&*attrs[0].value, "first");
            }
            _ => panic!("expected element"),
        });
    }
}
