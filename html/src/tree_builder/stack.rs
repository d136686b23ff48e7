//! The stack of open elements, with the "has an element in *scope*" family
//! of predicates.
//!
//! Grounded in `html5ever::tree_builder::stack::ElemStack`, simplified: the
//! teacher builds a lazy `HashMap`-based index once a scope scan walks more
//! than `SCAN_THRESHOLD` entries, to keep deeply-nested documents linear.
//! Real-world documents rarely nest anywhere near that deep, so this
//! version always scans linearly from the top; noted in DESIGN.md as a
//! deliberate simplification rather than a missed optimization.

use webparse_core::atom::TagName;
use webparse_core::namespace::Namespace;

/// One entry on the stack of open elements: enough to run scope predicates
/// without calling back into the sink for every element's name.
#[derive(Clone)]
pub(crate) struct StackEntry<Handle> {
    pub(crate) handle: Handle,
    pub(crate) name: TagName,
    pub(crate) ns: Namespace,
}

pub(crate) struct OpenElementsStack<Handle> {
    entries: Vec<StackEntry<Handle>>,
}

/// <https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-the-specific-scope>
const DEFAULT_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
];
const LIST_ITEM_SCOPE_EXTRA: &[&str] = &["ol", "ul"];
const BUTTON_SCOPE_EXTRA: &[&str] = &["button"];
const TABLE_SCOPE: &[&str] = &["html", "table", "template"];
const SELECT_SCOPE_EXCEPT: &[&str] = &["optgroup", "option"];

impl<Handle: Clone> OpenElementsStack<Handle> {
    pub(crate) fn new() -> Self {
        OpenElementsStack { entries: Vec::with_capacity(16) }
    }

    pub(crate) fn push(&mut self, handle: Handle, name: TagName, ns: Namespace) {
        self.entries.push(StackEntry { handle, name, ns });
    }

    pub(crate) fn pop(&mut self) -> Option<StackEntry<Handle>> {
        self.entries.pop()
    }

    pub(crate) fn top(&self) -> Option<&StackEntry<Handle>> {
        self.entries.last()
    }

    pub(crate) fn top_handle(&self) -> Option<Handle> {
        self.entries.last().map(|e| e.handle.clone())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &StackEntry<Handle>> {
        self.entries.iter()
    }

    pub(crate) fn handles(&self) -> impl DoubleEndedIterator<Item = Handle> + '_ {
        self.entries.iter().map(|e| e.handle.clone())
    }

    /// Position (from the top, 0 = current node) of the topmost element
    /// whose name is in `names`, stopping the search at the first element
    /// whose name is in `scope` (exclusive of `names` themselves). Returns
    /// `None` if no matching element is found before the scope boundary or
    /// the bottom of the stack.
    fn find_in_scope(&self, names: &[&str], scope: &[&str]) -> Option<usize> {
        for (i, entry) in self.entries.iter().enumerate().rev() {
            if entry.ns != Namespace::Html {
                continue;
            }
            let n = entry.name.as_str();
            if names.contains(&n) {
                return Some(i);
            }
            if scope.contains(&n) {
                return None;
            }
        }
        None
    }

    pub(crate) fn has_in_scope(&self, name: &str) -> bool {
        self.find_in_scope(&[name], DEFAULT_SCOPE).is_some()
    }

    pub(crate) fn has_one_of_in_scope(&self, names: &[&str]) -> bool {
        self.find_in_scope(names, DEFAULT_SCOPE).is_some()
    }

    pub(crate) fn has_in_list_item_scope(&self, name: &str) -> bool {
        let scope: Vec<&str> = DEFAULT_SCOPE.iter().chain(LIST_ITEM_SCOPE_EXTRA).copied().collect();
        self.find_in_scope(&[name], &scope).is_some()
    }

    pub(crate) fn has_in_button_scope(&self, name: &str) -> bool {
        let scope: Vec<&str> = DEFAULT_SCOPE.iter().chain(BUTTON_SCOPE_EXTRA).copied().collect();
        self.find_in_scope(&[name], &scope).is_some()
    }

    pub(crate) fn has_in_table_scope(&self, name: &str) -> bool {
        self.find_in_scope(&[name], TABLE_SCOPE).is_some()
    }

    /// Generalized form of the scope predicates above for the handful of
    /// rules that need an ad hoc name set and/or scope boundary (e.g. "is a
    /// `td` or `th` in table scope").
    pub(crate) fn has_any_in_scope(&self, names: &[&str], scope: &[&str]) -> bool {
        self.find_in_scope(names, scope).is_some()
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-select-scope>
    /// Every element counts as scope-breaking except `optgroup`/`option`.
    pub(crate) fn has_in_select_scope(&self, name: &str) -> bool {
        for entry in self.entries.iter().rev() {
            if entry.ns != Namespace::Html {
                return false;
            }
            let n = entry.name.as_str();
            if n == name {
                return true;
            }
            if !SELECT_SCOPE_EXCEPT.contains(&n) {
                return false;
            }
        }
        false
    }

    /// Index (from the bottom) of the last element named one of `names`,
    /// regardless of scope.
    pub(crate) fn position_of_last_named(&self, names: &[&str]) -> Option<usize> {
        self.entries.iter().rposition(|e| names.contains(&e.name.as_str()))
    }

    pub(crate) fn contains_named(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.as_str() == name)
    }

    /// Pop elements off the stack until (and including) one named `name` is
    /// popped. Does nothing if no such element is on the stack.
    pub(crate) fn pop_until_named(&mut self, name: &str) {
        while let Some(top) = self.entries.last() {
            let matched = top.name.as_str() == name;
            self.entries.pop();
            if matched {
                break;
            }
        }
    }

    pub(crate) fn pop_until<F: Fn(&str) -> bool>(&mut self, pred: F) {
        while let Some(top) = self.entries.last() {
            if pred(top.name.as_str()) {
                break;
            }
            self.entries.pop();
        }
    }

    pub(crate) fn remove_handle(&mut self, handle: &Handle)
    where
        Handle: PartialEq,
    {
        self.entries.retain(|e| &e.handle != handle);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub(crate) fn insert_at(&mut self, index: usize, handle: Handle, name: TagName, ns: Namespace) {
        self.entries.insert(index, StackEntry { handle, name, ns });
    }

    pub(crate) fn replace_at(&mut self, index: usize, handle: Handle, name: TagName, ns: Namespace) {
        self.entries[index] = StackEntry { handle, name, ns };
    }

    pub(crate) fn get(&self, index: usize) -> Option<&StackEntry<Handle>> {
        self.entries.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendril::StrTendril;

    fn push(stack: &mut OpenElementsStack<u32>, id: u32, name: &str, ns: Namespace) {
        stack.push(id, TagName::new(StrTendril::from(name)), ns);
    }

    #[test]
    fn table_cell_blocks_default_scope_but_not_table_scope() {
        let mut stack = OpenElementsStack::new();
        push(&mut stack, 1, "html", Namespace::Html);
        push(&mut stack, 2, "table", Namespace::Html);
        push(&mut stack, 3, "tbody", Namespace::Html);
        push(&mut stack, 4, "tr", Namespace::Html);
        push(&mut stack, 5, "td", Namespace::Html);
        push(&mut stack, 6, "b", Namespace::Html);

        // "b" is reachable in default scope: "td" is a scope boundary but
        // hasn't been crossed yet when we find "b" above it.
        assert!(stack.has_in_scope("b"));
        // Looking for "html" has to cross "td", a default-scope boundary,
        // so it should not be found even though it's on the stack.
        assert!(!stack.has_in_scope("html"));
        // Table scope's boundary set doesn't include "td", so it's visible.
        assert!(stack.has_in_table_scope("table"));
    }

    #[test]
    fn button_scope_adds_button_as_a_boundary() {
        let mut stack = OpenElementsStack::new();
        push(&mut stack, 1, "html", Namespace::Html);
        push(&mut stack, 2, "button", Namespace::Html);
        push(&mut stack, 3, "p", Namespace::Html);

        assert!(stack.has_in_button_scope("p"));
        // "html" sits below the button boundary, so button-scope can't see it.
        assert!(!stack.has_in_button_scope("html"));
    }

    #[test]
    fn select_scope_only_tolerates_optgroup_and_option() {
        let mut stack = OpenElementsStack::new();
        push(&mut stack, 1, "select", Namespace::Html);
        push(&mut stack, 2, "optgroup", Namespace::Html);
        push(&mut stack, 3, "option", Namespace::Html);

        assert!(stack.has_in_select_scope("select"));

        let mut blocked = OpenElementsStack::new();
        push(&mut blocked, 1, "select", Namespace::Html);
        push(&mut blocked, 2, "div", Namespace::Html);
        assert!(!blocked.has_in_select_scope("select"));
    }

    #[test]
    fn pop_until_named_stops_after_the_match() {
        let mut stack = OpenElementsStack::new();
        push(&mut stack, 1, "html", Namespace::Html);
        push(&mut stack, 2, "body", Namespace::Html);
        push(&mut stack, 3, "p", Namespace::Html);

        stack.pop_until_named("body");
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top().unwrap().name.as_str(), "html");
    }
}
