//! Internal types used by the tree constructor.
//!
//! Grounded in `html5ever::tree_builder::types`, simplified: this crate's
//! `Token` carries the same five cases the teacher's does (a tag, a
//! comment, a run of characters annotated with whitespace-ness, a lone null
//! character, and EOF) because the tree-construction algorithm only ever
//! needs to distinguish those.

use tendril::StrTendril;
use webparse_core::atom::TagName;

use crate::tokenizer::states::RawKind;
use crate::tokenizer::Tag;

/// <https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode>
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum SplitStatus {
    NotSplit,
    Whitespace,
    NotWhitespace,
}

/// A subset/refinement of `tokenizer::Token`; everything else (doctype,
/// encoding indicator) is handled directly in `process_token`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) enum Token {
    Tag(Tag),
    Comment(StrTendril),
    Characters(SplitStatus, StrTendril),
    NullCharacter,
    Eof,
}

pub(crate) enum ProcessResult<Handle> {
    Done,
    DoneAckSelfClosing,
    SplitWhitespace(StrTendril),
    Reprocess(InsertionMode, Token),
    Script(Handle),
    ToPlaintext,
    ToRawData(RawKind),
}

pub(crate) enum InsertionPoint<Handle> {
    LastChild(Handle),
    BeforeSibling { parent: Handle, sibling: Handle },
    TableFosterParenting { element: Handle, prev_element: Handle },
}

/// What a start-tag name maps to when deciding the initial RAWTEXT/RCDATA
/// switch in "in head"/"in body" etc.
pub(crate) fn tag_in(name: &TagName, set: &[&str]) -> bool {
    set.iter().any(|s| name.as_str() == *s)
}
