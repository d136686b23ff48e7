//! Black-box parse→serialize scenarios exercising tree-construction error
//! recovery (implied head/body insertion, bogus tags, the adoption agency,
//! foster parenting) and the decode pipeline's BOM handling end to end.

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
fn doctype_title_and_paragraph_get_implied_head_and_body() {
    let out = parse_and_serialize("<!DOCTYPE html><title>Hello</title><p>Welcome.");
    assert_eq!(
        out,
        "<!DOCTYPE html><html><head><title>Hello</title></head><body><p>Welcome.</p></body></html>"
    );
}

#[test]
fn unknown_numeric_tag_name_becomes_text_and_bogus_comment() {
    let out = parse_and_serialize("<42></42>");
    assert_eq!(out, "<html><head></head><body>&lt;42&gt;<!--42--></body></html>");
}

#[test]
fn adoption_agency_reparents_formatting_split_across_a_paragraph() {
    let out = parse_and_serialize("<p>1<b>2<i>3</b>4</i>5</p>");
    assert_eq!(
        out,
        "<html><head></head><body><p>1<b>2<i>3</i></b><i>4</i>5</p></body></html>"
    );
}

#[test]
fn table_foster_parents_text_and_elements_before_the_table() {
    let out = parse_and_serialize("<table><b><tr><td>aaa</td></tr>bbb</table>ccc");
    assert_eq!(
        out,
        "<html><head></head><body><b></b><b>bbb</b><table><tbody><tr><td>aaa</td></tr></tbody></table><b>ccc</b></body></html>"
    );
}

#[test]
fn adoption_agency_duplicates_an_anchor_around_a_table() {
    let out = parse_and_serialize(r#"<a href="a">a<table><a href="b">b</table>x"#);
    assert_eq!(
        out,
        r#"<html><head></head><body><a href="a">a<a href="b">b</a><table></table></a><a href="b">x</a></body></html>"#
    );
}

#[test]
fn utf8_bom_is_consumed_silently_and_decodes_the_rest() {
    let parser = Parser::parse_document(Dom::new(), UTF_8, ParseOpts::default());
    let bytes: [u8; 6] = [0xEF, 0xBB, 0xBF, 0xE3, 0x81, 0x82];
    parser.push_bytes(&bytes);
    parser.push_eof();
    let doc = parser.document();
    let out = parser.sink().with_arena(|arena| serialize_to_string(arena, doc).unwrap());
    assert_eq!(out, "<html><head></head><body>\u{3042}</body></html>");
}
