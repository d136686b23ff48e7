//! The `TreeSink` trait: the interface the tree constructor uses to build
//! a DOM without knowing anything about how that DOM is represented.
//!
//! Grounded in `markup5ever::interface` (`QualName`, `Attribute`) and
//! `markup5ever::interface::tree_builder` (`TreeSink`, `QuirksMode`,
//! `NodeOrText`, `ElementFlags`) — the latter module wasn't present in the
//! retrieval pack (only its re-exporting `mod.rs` was), so the trait below
//! is reconstructed from the well-known html5ever `TreeSink` shape and
//! trimmed to what this crate's tree constructor actually calls; see
//! DESIGN.md.

use std::borrow::Cow;

use tendril::StrTendril;
use webparse_core::atom::TagName;
use webparse_core::namespace::Namespace;
use webparse_core::qualname::Attribute;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    NoQuirks,
}

/// What to insert: either a node handle the sink already created (e.g. for
/// a `<script>` about to be appended) or a run of text, which the sink may
/// merge into a preceding text node per
/// <https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character>.
pub enum NodeOrText<Handle> {
    AppendNode(Handle),
    AppendText(StrTendril),
}

#[derive(Copy, Clone, Default, Debug)]
pub struct ElementFlags {
    pub template: bool,
    pub mathml_annotation_xml_integration_point: bool,
}

/// Whether the tokenizer should keep running or wait for the sink (after
/// executing a `<script>`) before consuming more input.
/// <https://html.spec.whatwg.org/multipage/parsing.html#nested-parser-activation>
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NextParserState {
    Continue,
    Suspend,
}

/// Receives tree-construction instructions from a `TreeBuilder`. A
/// DOM implementation (the `dom` crate's arena, or a test harness) provides
/// one of these; the tree constructor never touches node storage directly.
pub trait TreeSink {
    type Handle: Clone;

    fn parse_error(&self, msg: Cow<'static, str>);
    fn get_document(&self) -> Self::Handle;
    fn set_quirks_mode(&self, mode: QuirksMode);

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool;

    /// Namespace and local name of an already-created element, so the tree
    /// constructor can run scope/foreign-content checks without storing
    /// that information itself.
    fn elem_name(&self, target: &Self::Handle) -> (Namespace, TagName);

    fn create_element(
        &self,
        ns: Namespace,
        name: TagName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle;

    fn create_comment(&self, text: StrTendril) -> Self::Handle;

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>);

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>);

    /// Foster-parenting append: try `element` first; if it has no parent
    /// (it's not actually in the tree, e.g. a `<table>` that was never
    /// inserted), fall back to appending after `prev_element` instead.
    /// <https://html.spec.whatwg.org/multipage/parsing.html#foster-parent>
    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    );

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril);

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>);

    fn remove_from_parent(&self, target: &Self::Handle);

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle);

    fn mark_script_already_started(&self, node: &Self::Handle);

    /// Called with the node popped every time the tree constructor pops
    /// the stack of open elements. Most sinks can ignore this; default is
    /// a no-op, matching the teacher's default trait method.
    fn pop(&self, _node: &Self::Handle) {}

    fn associate_with_form(&self, target: &Self::Handle, form: &Self::Handle);

    fn is_mathml_annotation_xml_integration_point(&self, _handle: &Self::Handle) -> bool {
        false
    }

    fn set_current_line(&self, _line: u64) {}

    /// Execute the `<script>` element appended by `append`/`append_based_on_parent_node`.
    /// Returns whether the parser should suspend until the script signals it
    /// may continue (used by the driver's reentrancy queue).
    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }
}
