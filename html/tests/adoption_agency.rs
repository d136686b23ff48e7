//! Black-box coverage of the adoption agency algorithm
//! (`tree_builder::TreeBuilder::adoption_agency`), driven end to end through
//! `Parser` and `webparse_dom::Dom` since the algorithm is private and reads
//! from several pieces of `TreeBuilder`'s internal state (the open-elements
//! stack, the active formatting element list, the current node) that aren't
//! meaningfully exercisable in isolation from a mock sink.

use encoding_rs::UTF_8;
use webparse_dom::{serialize_to_string, Dom};
use webparse_html::{ParseOpts, Parser};

fn parse_and_serialize(input: &str) -> String {
    let parser = Parser::parse_document(Dom::new(), UTF_8, ParseOpts::default());
    parser.push_bytes(input.as_bytes());
    parser.push_eof();
    let doc = parser.document();
    parser.sink().with_arena(|arena| serialize_to_string(arena, doc).unwrap())
}

#[test]
fn misnested_formatting_elements_are_split_around_the_blocking_end_tag() {
    // Textbook "adoption agency" case: </b> ends up inside the tree while an
    // <i> is still open above it, so <b> has to be cloned on both sides of
    // the split and the original <i> is reparented under the new <b>.
    let out = parse_and_serialize("<p>1<b>2<i>3</b>4</i>5</p>");
    assert_eq!(out, "<html><head></head><body><p>1<b>2<i>3</i></b><i>4</i>5</p></body></html>");
}

#[test]
fn formatting_element_with_no_matching_end_tag_is_left_open() {
    // No </b> at all: adoption_agency's "no matching element" branch should
    // never fire, and <b> just stays open around everything after it.
    let out = parse_and_serialize("<p>1<b>2<i>3</p>");
    assert_eq!(out, "<html><head></head><body><p>1<b>2<i>3</i></b></p></body></html>");
}

#[test]
fn unopened_end_tag_for_a_formatting_element_is_a_no_op() {
    // </b> with no matching <b> anywhere on the stack or in the active
    // formatting list: the algorithm's "any other end tag" fallback pops
    // nothing and emits no new element.
    let out = parse_and_serialize("<p>text</b>more</p>");
    assert_eq!(out, "<html><head></head><body><p>textmore</p></body></html>");
}

#[test]
fn anchor_is_duplicated_around_a_table_boundary() {
    // The "bookmark" / Noah's-ark interaction: the adoption agency runs once
    // per misnested </a>, reparenting the table into the first <a> and
    // opening a fresh <a> clone for content that follows the table.
    let out = parse_and_serialize(r#"<a href="a">a<table><a href="b">b</table>x"#);
    assert_eq!(
        out,
        r#"<html><head></head><body><a href="a">a<a href="b">b</a><table></table></a><a href="b">x</a></body></html>"#
    );
}
