//! The list of active formatting elements.
//!
//! <https://html.spec.whatwg.org/multipage/parsing.html#the-list-of-active-formatting-elements>
//!
//! Grounded in `html5ever::tree_builder::mod`'s `active_formatting` field
//! and its `create_formatting_element_for`/`clear_active_formatting_to_marker`
//! /`reconstruct_active_formatting_elements` methods. The actual
//! reconstruction walk lives on `TreeBuilder` (in `tree_builder/mod.rs`)
//! since it needs to call back into tree insertion; this module only owns
//! the list storage and the parts of Noah's-ark/marker bookkeeping that
//! don't need insertion.

use crate::tokenizer::Tag;

pub(crate) enum FormatEntry<Handle> {
    Element(Handle, Tag),
    Marker,
}

pub(crate) struct ActiveFormattingList<Handle> {
    entries: Vec<FormatEntry<Handle>>,
}

impl<Handle: Clone + PartialEq> ActiveFormattingList<Handle> {
    pub(crate) fn new() -> Self {
        ActiveFormattingList { entries: Vec::new() }
    }

    pub(crate) fn push_marker(&mut self) {
        self.entries.push(FormatEntry::Marker);
    }

    /// Applies the Noah's-ark clause: if three elements equivalent to `tag`
    /// (modulo attribute order) already occur between the end of the list
    /// and the last marker (or the start of the list), the earliest one is
    /// removed before the new one is pushed.
    pub(crate) fn push_element(&mut self, handle: Handle, tag: Tag) {
        let mut first_match = None;
        let mut matches = 0usize;
        for (i, entry) in self.entries.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(_, old_tag) => {
                    if tag.equiv_modulo_attr_order(old_tag) {
                        first_match = Some(i);
                        matches += 1;
                    }
                }
            }
        }
        if matches >= 3 {
            self.entries.remove(first_match.expect("matches with no index"));
        }
        self.entries.push(FormatEntry::Element(handle, tag));
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#clear-the-list-of-active-formatting-elements-up-to-the-last-marker>
    pub(crate) fn clear_to_marker(&mut self) {
        while let Some(entry) = self.entries.pop() {
            if matches!(entry, FormatEntry::Marker) {
                break;
            }
        }
    }

    pub(crate) fn position_of(&self, handle: &Handle) -> Option<usize> {
        self.entries.iter().position(|e| matches!(e, FormatEntry::Element(h, _) if h == handle))
    }

    pub(crate) fn remove(&mut self, index: usize) -> FormatEntry<Handle> {
        self.entries.remove(index)
    }

    pub(crate) fn insert(&mut self, index: usize, entry: FormatEntry<Handle>) {
        self.entries.insert(index, entry);
    }

    pub(crate) fn replace(&mut self, index: usize, entry: FormatEntry<Handle>) {
        self.entries[index] = entry;
    }

    pub(crate) fn get(&self, index: usize) -> Option<&FormatEntry<Handle>> {
        self.entries.get(index)
    }

    pub(crate) fn last(&self) -> Option<&FormatEntry<Handle>> {
        self.entries.last()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Topmost element (last entry that isn't a marker), ignoring markers
    /// and scanning from the end, for finding an open formatting element.
    pub(crate) fn last_element_named(&self, name: &str) -> Option<(usize, &Handle, &Tag)> {
        for (i, entry) in self.entries.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => return None,
                FormatEntry::Element(h, tag) if tag.name.as_str() == name => return Some((i, h, tag)),
                FormatEntry::Element(..) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TagKind;
    use webparse_core::atom::TagName;
    use tendril::StrTendril;

    fn b_tag() -> Tag {
        Tag { kind: TagKind::StartTag, name: TagName::new(StrTendril::from("b")), self_closing: false, attrs: vec![] }
    }

    #[test]
    fn noahs_ark_drops_the_earliest_of_three_equivalent_entries() {
        let mut list: ActiveFormattingList<u32> = ActiveFormattingList::new();
        list.push_element(1, b_tag());
        list.push_element(2, b_tag());
        list.push_element(3, b_tag());
        // A 4th equivalent <b> should push the list over the limit of three
        // and evict the earliest (handle 1), not the other two.
        list.push_element(4, b_tag());

        assert_eq!(list.len(), 3);
        assert_eq!(list.position_of(&1), None);
        assert_eq!(list.position_of(&2), Some(0));
        assert_eq!(list.position_of(&4), Some(2));
    }

    #[test]
    fn clear_to_marker_stops_at_the_marker_and_consumes_it() {
        let mut list: ActiveFormattingList<u32> = ActiveFormattingList::new();
        list.push_element(1, b_tag());
        list.push_marker();
        list.push_element(2, b_tag());
        list.push_element(3, b_tag());

        list.clear_to_marker();

        assert_eq!(list.len(), 1);
        assert_eq!(list.position_of(&1), Some(0));
    }

    #[test]
    fn last_element_named_does_not_cross_a_marker() {
        let mut list: ActiveFormattingList<u32> = ActiveFormattingList::new();
        list.push_element(1, b_tag());
        list.push_marker();

        // The only "b" entry is on the far side of a marker (as happens
        // inside a newly-opened template or button), so it must not be
        // visible to a scan for reconstruction/adoption purposes.
        assert!(list.last_element_named("b").is_none());
    }
}
