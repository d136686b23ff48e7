//! The arena-backed DOM tree: `spec.md` §3 ("Tree") and §9 ask for integer
//! indices rather than the teacher's `Rc<Node>`/`Weak` graph, specifically
//! so the adoption agency can identify "the same element after being
//! reparented" by index identity and so a whole tree can be dropped without
//! reference counting. Node variants and what each one carries are grounded
//! in `markup5ever_rcdom::{Node, NodeData}`; the linkage (parent/sibling/
//! child indices, free list) is this crate's own, per the spec's design
//! notes.

use tendril::StrTendril;
use webparse_core::atom::TagName;
use webparse_core::namespace::Namespace;
use webparse_core::qualname::Attribute;

/// An index into an [`Arena`]. `NULL` (index 0) denotes "no node" — the
/// arena's slot 0 is never handed out as a real node, so comparisons
/// against it are unambiguous.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const NULL: NodeId = NodeId(0);

    fn is_null(self) -> bool {
        self.0 == 0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    NoQuirks,
}

/// The kind-specific payload of a node. A closed set, per `spec.md` §3 and
/// §9's "mirror this with a tagged enum rather than an interface
/// hierarchy."
#[derive(Debug)]
pub enum NodeData {
    Document { quirks_mode: QuirksMode },
    Doctype { name: StrTendril, public_id: StrTendril, system_id: StrTendril },
    Text { contents: StrTendril },
    Comment { contents: StrTendril },
    Element {
        ns: Namespace,
        name: TagName,
        attrs: Vec<Attribute>,
        /// `template` content, kept as ordinary children of this element —
        /// see `tree_builder/mod.rs`'s note on why shadow-tree isolation
        /// for `<template>` is out of scope.
        template: bool,
        mathml_annotation_xml_integration_point: bool,
    },
    DocumentFragment,
}

struct Node {
    data: NodeData,
    parent: NodeId,
    prev_sibling: NodeId,
    next_sibling: NodeId,
    first_child: NodeId,
    last_child: NodeId,
    /// Set for a tombstoned slot awaiting reuse; the next free slot is
    /// found via `parent` repurposed as an intrusive free-list pointer.
    free: bool,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Node {
            data,
            parent: NodeId::NULL,
            prev_sibling: NodeId::NULL,
            next_sibling: NodeId::NULL,
            first_child: NodeId::NULL,
            last_child: NodeId::NULL,
            free: false,
        }
    }
}

/// The arena that owns every node in a parsed document. Per `spec.md` §3's
/// invariants: every node appears in at most one tree, sibling links stay
/// consistent with first/last-child, and only `Document`/`DocumentFragment`
/// nodes may be roots (enforced by construction: [`Arena::new`] is the only
/// way to create the root, and [`Arena::append`]/[`Arena::insert_before`]
/// are the only ways to give a node a parent).
pub struct Arena {
    nodes: Vec<Node>,
    free_head: NodeId,
}

impl Arena {
    /// Creates an arena with a single `Document` node at id 0... except id
    /// 0 is reserved as the null sentinel, so the document actually lives
    /// at id 1. Callers get its id from [`Arena::document`].
    pub fn new() -> Self {
        let mut arena = Arena { nodes: vec![Node::new(NodeData::DocumentFragment)], free_head: NodeId::NULL };
        let doc = arena.create(NodeData::Document { quirks_mode: QuirksMode::NoQuirks });
        debug_assert_eq!(doc, Arena::DOCUMENT);
        arena
    }

    const DOCUMENT: NodeId = NodeId(1);

    pub fn document(&self) -> NodeId {
        Arena::DOCUMENT
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let p = self.nodes[id.index()].parent;
        (!p.is_null()).then_some(p)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let n = self.nodes[id.index()].next_sibling;
        (!n.is_null()).then_some(n)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let p = self.nodes[id.index()].prev_sibling;
        (!p.is_null()).then_some(p)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        let c = self.nodes[id.index()].first_child;
        (!c.is_null()).then_some(c)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        let c = self.nodes[id.index()].last_child;
        (!c.is_null()).then_some(c)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.first_child(id);
        std::iter::from_fn(move || {
            let next = cur?;
            cur = self.next_sibling(next);
            Some(next)
        })
    }

    /// Allocates a new, parentless node, reusing a tombstoned slot if one
    /// is free.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        if !self.free_head.is_null() {
            let id = self.free_head;
            let slot = &mut self.nodes[id.index()];
            self.free_head = slot.parent; // the free-list link
            *slot = Node::new(data);
            return id;
        }
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() as u32 - 1)
    }

    /// Detaches `id` from its current parent/siblings, if any, without
    /// freeing it.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.index()];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if parent.is_null() {
            return;
        }
        if !prev.is_null() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if !next.is_null() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let n = &mut self.nodes[id.index()];
        n.parent = NodeId::NULL;
        n.prev_sibling = NodeId::NULL;
        n.next_sibling = NodeId::NULL;
    }

    /// Appends `child` as the last child of `parent`. Detaches `child` from
    /// its previous location first, preserving invariant (4): a node
    /// appears in at most one tree.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let old_last = self.nodes[parent.index()].last_child;
        self.nodes[child.index()].parent = parent;
        self.nodes[child.index()].prev_sibling = old_last;
        if !old_last.is_null() {
            self.nodes[old_last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Inserts `child` as the immediate previous sibling of `before`.
    pub fn insert_before(&mut self, before: NodeId, child: NodeId) {
        self.detach(child);
        let parent = self.nodes[before.index()].parent;
        let prev = self.nodes[before.index()].prev_sibling;
        self.nodes[child.index()].parent = parent;
        self.nodes[child.index()].prev_sibling = prev;
        self.nodes[child.index()].next_sibling = before;
        self.nodes[before.index()].prev_sibling = child;
        if !prev.is_null() {
            self.nodes[prev.index()].next_sibling = child;
        } else if !parent.is_null() {
            self.nodes[parent.index()].first_child = child;
        }
    }

    /// Moves every child of `from` to the end of `to`'s children, in order.
    /// Used by the adoption agency when re-parenting a furthest block's
    /// subtree.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children: Vec<NodeId> = self.children(from).collect();
        for child in children {
            self.append(to, child);
        }
    }

    /// Removes `id` and every one of its descendants from the tree and
    /// returns their slots to the free list. `id` must already be detached
    /// (or is detached as a side effect — either way it is no longer
    /// reachable from its former parent afterward).
    pub fn remove_subtree(&mut self, id: NodeId) {
        self.detach(id);
        let mut subtree = vec![id];
        let mut frontier = vec![id];
        while let Some(node) = frontier.pop() {
            let children: Vec<NodeId> = self.children(node).collect();
            frontier.extend(children.iter().copied());
            subtree.extend(children);
        }
        // Free in reverse discovery order so `id` itself ends up at the
        // head of the free list and is the first slot reused.
        for node in subtree.into_iter().rev() {
            let slot = &mut self.nodes[node.index()];
            slot.free = true;
            slot.first_child = NodeId::NULL;
            slot.last_child = NodeId::NULL;
            slot.prev_sibling = NodeId::NULL;
            slot.next_sibling = NodeId::NULL;
            slot.parent = self.free_head; // repurposed as the free-list link
            self.free_head = node;
        }
    }

    /// Whether `ancestor` is `descendant` or one of its proper ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut cur = Some(descendant);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> NodeData {
        NodeData::Text { contents: StrTendril::from(s) }
    }

    #[test]
    fn append_and_children_order() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(text("a"));
        let b = arena.create(text("b"));
        arena.append(doc, a);
        arena.append(doc, b);
        assert_eq!(arena.children(doc).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(arena.parent(a), Some(doc));
        assert_eq!(arena.next_sibling(a), Some(b));
        assert_eq!(arena.prev_sibling(b), Some(a));
    }

    #[test]
    fn insert_before_updates_links() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(text("a"));
        let c = arena.create(text("c"));
        arena.append(doc, a);
        arena.append(doc, c);
        let b = arena.create(text("b"));
        arena.insert_before(c, b);
        assert_eq!(arena.children(doc).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn detach_removes_from_parent_but_keeps_node_alive() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(text("a"));
        arena.append(doc, a);
        arena.detach(a);
        assert_eq!(arena.children(doc).collect::<Vec<_>>(), Vec::<NodeId>::new());
        assert_eq!(arena.parent(a), None);
    }

    #[test]
    fn move_children_preserves_order() {
        let mut arena = Arena::new();
        let from = arena.create(NodeData::DocumentFragment);
        let to = arena.create(NodeData::DocumentFragment);
        let a = arena.create(text("a"));
        let b = arena.create(text("b"));
        arena.append(from, a);
        arena.append(from, b);
        arena.move_children(from, to);
        assert_eq!(arena.children(from).collect::<Vec<_>>(), Vec::<NodeId>::new());
        assert_eq!(arena.children(to).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn remove_subtree_frees_slots_for_reuse() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(text("a"));
        let child = arena.create(text("child"));
        arena.append(doc, a);
        arena.append(a, child);
        arena.remove_subtree(a);
        assert_eq!(arena.children(doc).collect::<Vec<_>>(), Vec::<NodeId>::new());
        let reused = arena.create(text("reused"));
        assert_eq!(reused, a, "freed slot should be reused by the next create()");
    }

    #[test]
    fn is_ancestor_detects_self_and_ancestors() {
        let mut arena = Arena::new();
        let doc = arena.document();
        let a = arena.create(text("a"));
        let b = arena.create(text("b"));
        arena.append(doc, a);
        arena.append(a, b);
        assert!(arena.is_ancestor(doc, b));
        assert!(arena.is_ancestor(a, a));
        assert!(!arena.is_ancestor(b, a));
    }
}
