//! The tree-construction rules: one function per insertion mode, dispatched
//! by [`TreeBuilder::step`].
//!
//! Grounded in `html5ever::tree_builder::rules`, which expresses this same
//! table with the `match_token!` macro over `local_name!`-interned tag
//! names. That macro (and the `match_token` crate providing it) isn't part
//! of this codebase's stack, so each arm below is a plain `match`/`if` over
//! `Tag`'s `kind`/`name` fields, matching the macro's semantics one rule at
//! a time: a `tag @ <name1> <name2> => else` header in the teacher's source
//! means "handle these names the same as the mode's trailing wildcard rule"
//! and is modeled here by simply leaving those names out of the specific
//! arms, so they fall through to that wildcard.

use std::borrow::Cow::Borrowed;

use tendril::StrTendril;
use webparse_core::atom::TagName;
use webparse_core::namespace::Namespace;

use crate::interface::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use crate::tokenizer::states::RawKind;
use crate::tokenizer::{Tag, TagKind};

use super::foreign;
use super::stack::StackEntry;
use super::tag_sets;
use super::types::{InsertionMode, ProcessResult, SplitStatus, Token};
use super::TreeBuilder;

fn any_not_whitespace(s: &str) -> bool {
    s.chars().any(|c| !c.is_ascii_whitespace())
}

impl<Sink> TreeBuilder<Sink>
where
    Sink: TreeSink,
    Sink::Handle: Clone + PartialEq,
{
    pub(crate) fn step(&self, mode: InsertionMode, token: Token) -> ProcessResult<Sink::Handle> {
        match mode {
            InsertionMode::Initial => self.step_initial(token),
            InsertionMode::BeforeHtml => self.step_before_html(token),
            InsertionMode::BeforeHead => self.step_before_head(token),
            InsertionMode::InHead => self.step_in_head(token),
            InsertionMode::InHeadNoscript => self.step_in_head_noscript(token),
            InsertionMode::AfterHead => self.step_after_head(token),
            InsertionMode::InBody => self.step_in_body(token),
            InsertionMode::Text => self.step_text(token),
            InsertionMode::InTable => self.step_in_table(token),
            InsertionMode::InTableText => self.step_in_table_text(token),
            InsertionMode::InCaption => self.step_in_caption(token),
            InsertionMode::InColumnGroup => self.step_in_column_group(token),
            InsertionMode::InTableBody => self.step_in_table_body(token),
            InsertionMode::InRow => self.step_in_row(token),
            InsertionMode::InCell => self.step_in_cell(token),
            InsertionMode::InSelect => self.step_in_select(token),
            InsertionMode::InSelectInTable => self.step_in_select_in_table(token),
            InsertionMode::InTemplate => self.step_in_template(token),
            InsertionMode::AfterBody => self.step_after_body(token),
            InsertionMode::InFrameset => self.step_in_frameset(token),
            InsertionMode::AfterFrameset => self.step_after_frameset(token),
            InsertionMode::AfterAfterBody => self.step_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.step_after_after_frameset(token),
        }
    }

    //§ the-initial-insertion-mode
    fn step_initial(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Characters(SplitStatus::NotSplit, text) => ProcessResult::SplitWhitespace(text),
            Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
            Token::Comment(text) => self.append_comment_to_doc(text),
            token => {
                if !self.opts_iframe_srcdoc() {
                    self.unexpected(&token);
                    self.set_quirks_mode(QuirksMode::Quirks);
                }
                ProcessResult::Reprocess(InsertionMode::BeforeHtml, token)
            }
        }
    }

    //§ the-before-html-insertion-mode
    fn step_before_html(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return ProcessResult::Done,
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment_to_doc(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.create_root(tag.attrs);
                self.mode_set(InsertionMode::BeforeHead);
                return ProcessResult::Done;
            }
            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {}
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            _ => {}
        }
        self.create_root(vec![]);
        ProcessResult::Reprocess(InsertionMode::BeforeHead, token)
    }

    //§ the-before-head-insertion-mode
    fn step_before_head(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return ProcessResult::Done,
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "head" => {
                let Token::Tag(tag) = token else { unreachable!() };
                let head = self.insert_element_for(tag);
                *self.head_elem_mut() = Some(head);
                self.mode_set(InsertionMode::InHead);
                return ProcessResult::Done;
            }
            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {}
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            _ => {}
        }
        let head = self.insert_phantom("head");
        *self.head_elem_mut() = Some(head);
        ProcessResult::Reprocess(InsertionMode::InHead, token)
    }

    //§ parsing-main-inhead
    fn step_in_head(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return self.append_text(text);
            }
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "base" | "basefont" | "bgsound" | "link" | "meta") =>
            {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_and_pop_element_for(tag);
                return ProcessResult::DoneAckSelfClosing;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "title" => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.parse_raw_text(tag, RawKind::Rcdata);
            }
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "noframes" | "style" | "noscript") =>
            {
                let Token::Tag(tag) = token else { unreachable!() };
                if !self.opts_scripting_enabled() && tag.name.as_str() == "noscript" {
                    self.insert_element_for(tag);
                    self.mode_set(InsertionMode::InHeadNoscript);
                    return ProcessResult::Done;
                }
                return self.parse_raw_text(tag, RawKind::Rawtext);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "script" => {
                let Token::Tag(tag) = token else { unreachable!() };
                let name = tag.name.clone();
                let elem = self.sink.create_element(Namespace::Html, tag.name, tag.attrs, ElementFlags::default());
                if self.is_fragment() {
                    self.sink.mark_script_already_started(&elem);
                }
                self.insert_appropriately_pub(NodeOrText::AppendNode(elem.clone()));
                self.open_elems_push(elem, name, Namespace::Html);
                return self.to_raw_text_mode(RawKind::ScriptData);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "head" => {
                self.pop();
                self.mode_set(InsertionMode::AfterHead);
                return ProcessResult::Done;
            }
            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "body" | "html" | "br") => {}
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "template" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.push_marker();
                self.frameset_ok_set(false);
                self.mode_set(InsertionMode::InTemplate);
                self.template_modes_push(InsertionMode::InTemplate);
                self.insert_element_for(tag);
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "template" => {
                let Token::Tag(tag) = token else { unreachable!() };
                if !self.in_html_elem_named("template") {
                    return self.unexpected(&tag);
                }
                self.generate_implied_end_tags(tag_sets::THOROUGH_IMPLIED_END);
                self.expect_to_close("template");
                self.clear_active_formatting_to_marker();
                self.template_modes_pop();
                let mode = self.reset_insertion_mode();
                self.mode_set(mode);
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "head" => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            _ => {}
        }
        self.pop();
        ProcessResult::Reprocess(InsertionMode::AfterHead, token)
    }

    //§ parsing-main-inheadnoscript
    fn step_in_head_noscript(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "noscript" => {
                self.pop();
                self.mode_set(InsertionMode::InHead);
                return ProcessResult::Done;
            }
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return self.step(InsertionMode::InHead, token),
            Token::Comment(_) => return self.step(InsertionMode::InHead, token),
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style") =>
            {
                return self.step(InsertionMode::InHead, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "br" => {}
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "head" | "noscript") =>
            {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            _ => {}
        }
        self.unexpected(&token);
        self.pop();
        ProcessResult::Reprocess(InsertionMode::InHead, token)
    }

    //§ the-after-head-insertion-mode
    fn step_after_head(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return self.append_text(text);
            }
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "body" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_element_for(tag);
                self.frameset_ok_set(false);
                self.mode_set(InsertionMode::InBody);
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "frameset" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InFrameset);
                return ProcessResult::Done;
            }
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ) =>
            {
                self.unexpected(&token);
                let head = self.head_elem_clone().expect("no head element");
                self.open_elems_push(head.clone(), TagName::new(StrTendril::from_slice("head")), Namespace::Html);
                let result = self.step(InsertionMode::InHead, token);
                self.open_elems_remove(&head);
                return result;
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "template" => {
                return self.step(InsertionMode::InHead, token);
            }
            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "body" | "html" | "br") => {}
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "head" => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let Token::Tag(tag) = token else { unreachable!() };
                return self.unexpected(&tag);
            }
            _ => {}
        }
        self.insert_phantom("body");
        ProcessResult::Reprocess(InsertionMode::InBody, token)
    }

    //§ parsing-main-inbody
    fn step_in_body(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::NullCharacter => self.unexpected(&"null character"),

            Token::Characters(_, text) => {
                self.reconstruct_active_formatting_elements();
                if any_not_whitespace(&text) {
                    self.frameset_ok_set(false);
                }
                self.append_text(text)
            }

            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                self.unexpected(&tag);
                if !self.in_html_elem_named("template") {
                    let top = self.html_elem_pub();
                    self.sink.add_attrs_if_missing(&top, tag.attrs);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ) =>
            {
                self.step(InsertionMode::InHead, Token::Tag(tag))
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "template" => {
                self.step(InsertionMode::InHead, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "body" => {
                self.unexpected(&tag);
                if let Some(node) = self.body_elem() {
                    if self.open_elems_len() != 1 && !self.in_html_elem_named("template") {
                        self.frameset_ok_set(false);
                        self.sink.add_attrs_if_missing(&node, tag.attrs);
                    }
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "frameset" => {
                self.unexpected(&tag);
                if !self.frameset_ok_get() {
                    return ProcessResult::Done;
                }
                let Some(body) = self.body_elem() else {
                    return ProcessResult::Done;
                };
                self.sink.remove_from_parent(&body);
                self.open_elems_truncate(1);
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InFrameset);
                ProcessResult::Done
            }

            Token::Eof => {
                if !self.template_modes_is_empty() {
                    self.step(InsertionMode::InTemplate, Token::Eof)
                } else {
                    self.check_body_end();
                    self.stop_parsing_pub()
                }
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "body" => {
                if self.has_in_default_scope("body") {
                    self.check_body_end();
                    self.mode_set(InsertionMode::AfterBody);
                } else {
                    self.sink.parse_error(Borrowed("</body> with no <body> in scope"));
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "html" => {
                if self.has_in_default_scope("body") {
                    self.check_body_end();
                    ProcessResult::Reprocess(InsertionMode::AfterBody, Token::Tag(tag))
                } else {
                    self.sink.parse_error(Borrowed("</html> with no <body> in scope"));
                    ProcessResult::Done
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog" | "dir"
                            | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer" | "header" | "hgroup"
                            | "main" | "menu" | "nav" | "ol" | "p" | "search" | "section" | "summary" | "ul"
                    ) =>
            {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") =>
            {
                self.close_p_element_in_button_scope();
                if self.current_node_named_any(tag_sets::HEADING) {
                    self.sink.parse_error(Borrowed("nested heading tags"));
                    self.pop();
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "pre" | "listing") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                self.ignore_lf_set(true);
                self.frameset_ok_set(false);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "form" => {
                if self.form_elem_is_some() && !self.in_html_elem_named("template") {
                    self.sink.parse_error(Borrowed("nested forms"));
                } else {
                    self.close_p_element_in_button_scope();
                    let elem = self.insert_element_for(tag);
                    if !self.in_html_elem_named("template") {
                        self.set_form_elem(Some(elem));
                    }
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "li" | "dd" | "dt") => {
                self.frameset_ok_set(false);
                let list = tag.name.as_str() == "li";
                let mut to_close: Option<String> = None;
                {
                    let open = self.open_elems_ref();
                    for entry in open.iter().rev() {
                        let name = entry.name.as_str();
                        let can_close =
                            if list { name == "li" } else { name == "dd" || name == "dt" };
                        if can_close {
                            to_close = Some(name.to_string());
                            break;
                        }
                        if tag_sets::contains(tag_sets::SPECIAL, name) && !matches!(name, "address" | "div" | "p") {
                            break;
                        }
                    }
                }
                if let Some(name) = to_close {
                    self.generate_implied_end_tags_except(&name);
                    self.expect_to_close(&name);
                }
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "plaintext" => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::ToPlaintext
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "button" => {
                if self.has_in_default_scope("button") {
                    self.sink.parse_error(Borrowed("nested buttons"));
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    self.open_elems_mut().pop_until_named("button");
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok_set(false);
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "address" | "article" | "aside" | "blockquote" | "button" | "center" | "details" | "dialog"
                            | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer" | "header"
                            | "hgroup" | "listing" | "main" | "menu" | "nav" | "ol" | "pre" | "search" | "section"
                            | "summary" | "ul"
                    ) =>
            {
                if !self.has_in_default_scope(tag.name.as_str()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    self.expect_to_close(tag.name.as_str());
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "form" => {
                self.end_tag_form()
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "p" => {
                if !self.has_in_button_scope("p") {
                    self.sink.parse_error(Borrowed("No <p> tag to close"));
                    self.insert_phantom("p");
                }
                self.close_p_element();
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "li" | "dd" | "dt") => {
                let in_scope = if tag.name.as_str() == "li" {
                    self.has_in_list_item_scope("li")
                } else {
                    self.has_in_default_scope(tag.name.as_str())
                };
                if in_scope {
                    self.generate_implied_end_tags_except(tag.name.as_str());
                    self.expect_to_close(tag.name.as_str());
                } else {
                    self.sink.parse_error(Borrowed("No matching tag to close"));
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") =>
            {
                if self.has_any_in_default_scope(tag_sets::HEADING) {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    if !self.current_node_named(tag.name.as_str()) {
                        self.sink.parse_error(Borrowed("Closing wrong heading tag"));
                    }
                    self.open_elems_mut().pop_until(|n| tag_sets::contains(tag_sets::HEADING, n));
                    self.open_elems_mut().pop();
                } else {
                    self.sink.parse_error(Borrowed("No heading tag to close"));
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "a" => {
                self.handle_misnested_a_tags(&tag);
                self.reconstruct_active_formatting_elements();
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike" | "strong" | "tt" | "u"
                    ) =>
            {
                self.reconstruct_active_formatting_elements();
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "nobr" => {
                self.reconstruct_active_formatting_elements();
                if self.has_in_default_scope("nobr") {
                    self.sink.parse_error(Borrowed("Nested <nobr>"));
                    self.adoption_agency_pub("nobr");
                    self.reconstruct_active_formatting_elements();
                }
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small" | "strike"
                            | "strong" | "tt" | "u"
                    ) =>
            {
                self.adoption_agency_pub(tag.name.as_str());
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "applet" | "marquee" | "object") =>
            {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.push_marker();
                self.frameset_ok_set(false);
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "applet" | "marquee" | "object") =>
            {
                if !self.has_in_default_scope(tag.name.as_str()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    self.expect_to_close(tag.name.as_str());
                    self.clear_active_formatting_to_marker();
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "table" => {
                if self.quirks_mode_get() != QuirksMode::Quirks {
                    self.close_p_element_in_button_scope();
                }
                self.insert_element_for(tag);
                self.frameset_ok_set(false);
                self.mode_set(InsertionMode::InTable);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "br" => {
                self.unexpected(&tag);
                self.step(
                    InsertionMode::InBody,
                    Token::Tag(Tag { kind: TagKind::StartTag, attrs: vec![], ..tag }),
                )
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "area" | "br" | "embed" | "img" | "keygen" | "wbr" | "input") =>
            {
                let keep_frameset_ok =
                    if tag.name.as_str() == "input" { self.is_type_hidden(&tag) } else { false };
                self.reconstruct_active_formatting_elements();
                self.insert_and_pop_element_for(tag);
                if !keep_frameset_ok {
                    self.frameset_ok_set(false);
                }
                ProcessResult::DoneAckSelfClosing
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "param" | "source" | "track") => {
                self.insert_and_pop_element_for(tag);
                ProcessResult::DoneAckSelfClosing
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "hr" => {
                self.close_p_element_in_button_scope();
                self.insert_and_pop_element_for(tag);
                self.frameset_ok_set(false);
                ProcessResult::DoneAckSelfClosing
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "image" => {
                self.unexpected(&tag);
                self.step(
                    InsertionMode::InBody,
                    Token::Tag(Tag { name: TagName::new(StrTendril::from_slice("img")), ..tag }),
                )
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "textarea" => {
                self.ignore_lf_set(true);
                self.frameset_ok_set(false);
                self.parse_raw_text(tag, RawKind::Rcdata)
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "xmp" => {
                self.close_p_element_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok_set(false);
                self.parse_raw_text(tag, RawKind::Rawtext)
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "iframe" => {
                self.frameset_ok_set(false);
                self.parse_raw_text(tag, RawKind::Rawtext)
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "noembed" => {
                self.parse_raw_text(tag, RawKind::Rawtext)
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "select" => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok_set(false);
                let next = match self.mode_get_impl() {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
                self.mode_set(next);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "optgroup" | "option") => {
                if self.current_node_named("option") {
                    self.pop();
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "rb" | "rtc") => {
                if self.has_in_default_scope("ruby") {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                }
                if !self.current_node_named("ruby") {
                    self.unexpected(&tag);
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "rp" | "rt") => {
                if self.has_in_default_scope("ruby") {
                    self.generate_implied_end_tags_except("rtc");
                }
                if !self.current_node_named("rtc") && !self.current_node_named("ruby") {
                    self.unexpected(&tag);
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "math" => {
                self.enter_foreign(tag, Namespace::MathMl)
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "svg" => {
                self.enter_foreign(tag, Namespace::Svg)
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td" | "tfoot" | "th"
                            | "thead" | "tr"
                    ) =>
            {
                self.unexpected(&tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag => {
                if self.opts_scripting_enabled() && tag.name.as_str() == "noscript" {
                    self.parse_raw_text(tag, RawKind::Rawtext)
                } else {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    ProcessResult::Done
                }
            }

            Token::Tag(tag) => {
                self.process_end_tag_in_body_pub(tag);
                ProcessResult::Done
            }

            Token::Eof => unreachable!("Eof handled above"),
        }
    }

    //§ parsing-main-incdata
    fn step_text(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Characters(_, text) => self.append_text(text),
            Token::Eof => {
                self.unexpected(&"eof in text");
                if self.current_node_named("script") {
                    let current = self.current_node_pub();
                    self.sink.mark_script_already_started(&current);
                }
                self.pop();
                ProcessResult::Reprocess(self.orig_mode_take(), Token::Eof)
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag => {
                let node = self.pop();
                self.mode_set(self.orig_mode_take());
                if tag.name.as_str() == "script" {
                    if let Some(node) = node {
                        return ProcessResult::Script(node);
                    }
                }
                ProcessResult::Done
            }
            _ => ProcessResult::Done,
        }
    }

    //§ parsing-main-intable
    fn step_in_table(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::NullCharacter => self.process_chars_in_table(Token::NullCharacter),
            Token::Characters(..) => self.process_chars_in_table(token),
            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "caption" => {
                self.pop_until_current(tag_sets::TABLE_SCOPE);
                self.push_marker();
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InCaption);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "colgroup" => {
                self.pop_until_current(tag_sets::TABLE_SCOPE);
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InColumnGroup);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "col" => {
                self.pop_until_current(tag_sets::TABLE_SCOPE);
                self.insert_phantom("colgroup");
                ProcessResult::Reprocess(InsertionMode::InColumnGroup, Token::Tag(tag))
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                self.pop_until_current(tag_sets::TABLE_SCOPE);
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InTableBody);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "td" | "th" | "tr") => {
                self.pop_until_current(tag_sets::TABLE_SCOPE);
                self.insert_phantom("tbody");
                ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "table" => {
                self.unexpected(&tag);
                if self.has_in_table_scope("table") {
                    self.open_elems_mut().pop_until_named("table");
                    let mode = self.reset_insertion_mode();
                    ProcessResult::Reprocess(mode, Token::Tag(tag))
                } else {
                    ProcessResult::Done
                }
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "table" => {
                if self.has_in_table_scope("table") {
                    self.open_elems_mut().pop_until_named("table");
                    let mode = self.reset_insertion_mode();
                    self.mode_set(mode);
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th" | "thead"
                            | "tr"
                    ) =>
            {
                self.unexpected(&tag)
            }

            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "style" | "script" | "template"))
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "template") =>
            {
                self.step(InsertionMode::InHead, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "input" => {
                self.unexpected(&tag);
                if self.is_type_hidden(&tag) {
                    self.insert_and_pop_element_for(tag);
                    ProcessResult::DoneAckSelfClosing
                } else {
                    self.foster_parent_in_body_pub(Token::Tag(tag))
                }
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "form" => {
                self.unexpected(&tag);
                if !self.in_html_elem_named("template") && !self.form_elem_is_some() {
                    let elem = self.insert_and_pop_element_for(tag);
                    self.set_form_elem(Some(elem));
                }
                ProcessResult::Done
            }

            Token::Eof => self.step(InsertionMode::InBody, Token::Eof),

            token => {
                self.unexpected(&token);
                self.foster_parent_in_body_pub(token)
            }
        }
    }

    //§ parsing-main-intabletext
    fn step_in_table_text(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::NullCharacter => self.unexpected(&"null character in table text"),
            Token::Characters(split, text) => {
                self.pending_table_text_push(split, text);
                ProcessResult::Done
            }
            token => {
                let pending = self.pending_table_text_take();
                let contains_nonspace = pending.iter().any(|(split, text)| match split {
                    SplitStatus::Whitespace => false,
                    SplitStatus::NotWhitespace => true,
                    SplitStatus::NotSplit => any_not_whitespace(text),
                });

                if contains_nonspace {
                    self.sink.parse_error(Borrowed("Non-space table text"));
                    for (split, text) in pending {
                        match self.foster_parent_in_body_pub(Token::Characters(split, text)) {
                            ProcessResult::Done => {}
                            _ => unreachable!("foster-parented character token always returns Done"),
                        }
                    }
                } else {
                    for (_, text) in pending {
                        self.append_text(text);
                    }
                }

                ProcessResult::Reprocess(self.orig_mode_take(), token)
            }
        }
    }

    //§ parsing-main-incaption
    fn step_in_caption(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Tag(tag)
                if matches!(
                    (tag.kind, tag.name.as_str()),
                    (TagKind::StartTag, "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr")
                        | (TagKind::EndTag, "table" | "caption")
                ) =>
            {
                if self.has_in_table_scope("caption") {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    self.expect_to_close("caption");
                    self.clear_active_formatting_to_marker();
                    if tag.kind == TagKind::EndTag && tag.name.as_str() == "caption" {
                        self.mode_set(InsertionMode::InTable);
                        ProcessResult::Done
                    } else {
                        ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                    }
                } else {
                    self.unexpected(&tag)
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr"
                    ) =>
            {
                self.unexpected(&tag)
            }

            token => self.step(InsertionMode::InBody, token),
        }
    }

    //§ parsing-main-incolgroup
    fn step_in_column_group(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return self.append_text(text);
            }
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "col" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_and_pop_element_for(tag);
                return ProcessResult::DoneAckSelfClosing;
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "colgroup" => {
                return if self.current_node_named("colgroup") {
                    self.pop();
                    self.mode_set(InsertionMode::InTable);
                    ProcessResult::Done
                } else {
                    self.unexpected(&token)
                };
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "col" => {
                return self.unexpected(&token);
            }
            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag && tag.name.as_str() == "template")
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "template") =>
            {
                return self.step(InsertionMode::InHead, token);
            }
            Token::Eof => return self.step(InsertionMode::InBody, token),
            _ => {}
        }
        if self.current_node_named("colgroup") {
            self.pop();
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        } else {
            self.unexpected(&token)
        }
    }

    //§ parsing-main-intbody
    fn step_in_table_body(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "tr" => {
                self.pop_until_current(tag_sets::TABLE_BODY_CONTEXT);
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InRow);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "th" | "td") => {
                self.unexpected(&tag);
                self.pop_until_current(tag_sets::TABLE_BODY_CONTEXT);
                self.insert_phantom("tr");
                ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if self.has_in_table_scope(tag.name.as_str()) {
                    self.pop_until_current(tag_sets::TABLE_BODY_CONTEXT);
                    self.pop();
                    self.mode_set(InsertionMode::InTable);
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"))
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "table") =>
            {
                if self.has_any_in_scope(&["table", "tbody", "tfoot"], tag_sets::TABLE_SCOPE) {
                    self.pop_until_current(tag_sets::TABLE_BODY_CONTEXT);
                    self.pop();
                    ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                } else {
                    self.unexpected(&tag)
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                    ) =>
            {
                self.unexpected(&tag)
            }

            token => self.step(InsertionMode::InTable, token),
        }
    }

    //§ parsing-main-intr
    fn step_in_row(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "th" | "td") => {
                self.pop_until_current(tag_sets::TABLE_ROW_CONTEXT);
                self.insert_element_for(tag);
                self.mode_set(InsertionMode::InCell);
                self.push_marker();
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "tr" => {
                if self.has_in_table_scope("tr") {
                    self.pop_until_current(tag_sets::TABLE_ROW_CONTEXT);
                    self.pop();
                    self.mode_set(InsertionMode::InTableBody);
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"))
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "table") =>
            {
                if self.has_in_table_scope("tr") {
                    self.pop_until_current(tag_sets::TABLE_ROW_CONTEXT);
                    self.pop();
                    ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                } else {
                    self.unexpected(&tag)
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if self.has_in_table_scope(tag.name.as_str()) {
                    if self.has_in_table_scope("tr") {
                        self.pop_until_current(tag_sets::TABLE_ROW_CONTEXT);
                        self.pop();
                        ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                    } else {
                        ProcessResult::Done
                    }
                } else {
                    self.unexpected(&tag)
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(tag.name.as_str(), "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th") =>
            {
                self.unexpected(&tag)
            }

            token => self.step(InsertionMode::InTable, token),
        }
    }

    //§ parsing-main-intd
    fn step_in_cell(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Tag(tag) if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "td" | "th") => {
                if self.has_in_table_scope(tag.name.as_str()) {
                    self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
                    self.expect_to_close(tag.name.as_str());
                    self.clear_active_formatting_to_marker();
                    self.mode_set(InsertionMode::InRow);
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr"
                    ) =>
            {
                if self.has_any_in_scope(&["td", "th"], tag_sets::TABLE_SCOPE) {
                    self.close_the_cell_pub();
                    ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                } else {
                    self.unexpected(&tag)
                }
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(tag.name.as_str(), "body" | "caption" | "col" | "colgroup" | "html") =>
            {
                self.unexpected(&tag)
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag && matches!(tag.name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if self.has_in_table_scope(tag.name.as_str()) {
                    self.close_the_cell_pub();
                    ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                } else {
                    self.unexpected(&tag)
                }
            }

            token => self.step(InsertionMode::InBody, token),
        }
    }

    //§ parsing-main-inselect
    fn step_in_select(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::NullCharacter => self.unexpected(&"null character in select"),
            Token::Characters(_, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                self.step(InsertionMode::InBody, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "option" => {
                if self.current_node_named("option") {
                    self.pop();
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "optgroup" => {
                if self.current_node_named("option") {
                    self.pop();
                }
                if self.current_node_named("optgroup") {
                    self.pop();
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "hr" => {
                if self.current_node_named("option") {
                    self.pop();
                }
                if self.current_node_named("optgroup") {
                    self.pop();
                }
                self.insert_element_for(tag);
                self.pop();
                ProcessResult::DoneAckSelfClosing
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "optgroup" => {
                let drop_one = {
                    let open = self.open_elems_ref();
                    open.len() >= 2
                        && matches!(open.top(), Some(e) if e.ns == Namespace::Html && e.name.as_str() == "option")
                        && matches!(open.get(open.len() - 2), Some(e) if e.ns == Namespace::Html && e.name.as_str() == "optgroup")
                };
                if drop_one {
                    self.pop();
                }
                if self.current_node_named("optgroup") {
                    self.pop();
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "option" => {
                if self.current_node_named("option") {
                    self.pop();
                } else {
                    self.unexpected(&tag);
                }
                ProcessResult::Done
            }

            Token::Tag(tag) if matches!(tag.name.as_str(), "select") => {
                let in_scope = self.has_in_select_scope("select");
                if !in_scope || tag.kind == TagKind::StartTag {
                    self.unexpected(&tag);
                }
                if in_scope {
                    self.open_elems_mut().pop_until_named("select");
                    let mode = self.reset_insertion_mode();
                    self.mode_set(mode);
                }
                ProcessResult::Done
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "input" | "keygen" | "textarea") =>
            {
                self.unexpected(&tag);
                if self.has_in_select_scope("select") {
                    self.open_elems_mut().pop_until_named("select");
                    let mode = self.reset_insertion_mode();
                    ProcessResult::Reprocess(mode, Token::Tag(tag))
                } else {
                    ProcessResult::Done
                }
            }

            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "script" | "template"))
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "template") =>
            {
                self.step(InsertionMode::InHead, Token::Tag(tag))
            }

            Token::Eof => self.step(InsertionMode::InBody, Token::Eof),

            token => self.unexpected(&token),
        }
    }

    //§ parsing-main-inselectintable
    fn step_in_select_in_table(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                    ) =>
            {
                self.unexpected(&tag);
                self.open_elems_mut().pop_until_named("select");
                let mode = self.reset_insertion_mode();
                ProcessResult::Reprocess(mode, Token::Tag(tag))
            }

            Token::Tag(tag)
                if tag.kind == TagKind::EndTag
                    && matches!(
                        tag.name.as_str(),
                        "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                    ) =>
            {
                self.unexpected(&tag);
                if self.has_in_table_scope(tag.name.as_str()) {
                    self.open_elems_mut().pop_until_named("select");
                    let mode = self.reset_insertion_mode();
                    ProcessResult::Reprocess(mode, Token::Tag(tag))
                } else {
                    ProcessResult::Done
                }
            }

            token => self.step(InsertionMode::InSelect, token),
        }
    }

    //§ parsing-main-intemplate
    fn step_in_template(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match token {
            Token::Characters(..) => self.step(InsertionMode::InBody, token),
            Token::Comment(_) => self.step(InsertionMode::InBody, token),

            Token::Tag(tag)
                if (tag.kind == TagKind::StartTag
                    && matches!(
                        tag.name.as_str(),
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ))
                    || (tag.kind == TagKind::EndTag && tag.name.as_str() == "template") =>
            {
                self.step(InsertionMode::InHead, Token::Tag(tag))
            }

            Token::Tag(tag)
                if tag.kind == TagKind::StartTag
                    && matches!(tag.name.as_str(), "caption" | "colgroup" | "tbody" | "tfoot" | "thead") =>
            {
                self.template_modes_pop();
                self.template_modes_push(InsertionMode::InTable);
                ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "col" => {
                self.template_modes_pop();
                self.template_modes_push(InsertionMode::InColumnGroup);
                ProcessResult::Reprocess(InsertionMode::InColumnGroup, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "tr" => {
                self.template_modes_pop();
                self.template_modes_push(InsertionMode::InTableBody);
                ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag && matches!(tag.name.as_str(), "td" | "th") => {
                self.template_modes_pop();
                self.template_modes_push(InsertionMode::InRow);
                ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
            }

            Token::Eof => {
                if !self.in_html_elem_named("template") {
                    self.stop_parsing_pub()
                } else {
                    self.unexpected(&"eof in template");
                    self.open_elems_mut().pop_until_named("template");
                    self.clear_active_formatting_to_marker();
                    self.template_modes_pop();
                    let mode = self.reset_insertion_mode();
                    ProcessResult::Reprocess(mode, Token::Eof)
                }
            }

            Token::Tag(tag) if tag.kind == TagKind::StartTag => {
                self.template_modes_pop();
                self.template_modes_push(InsertionMode::InBody);
                ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
            }

            token => self.unexpected(&token),
        }
    }

    //§ parsing-main-afterbody
    fn step_after_body(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return self.step(InsertionMode::InBody, token),
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment_to_html(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "html" => {
                if self.is_fragment() {
                    self.unexpected(&token);
                } else {
                    self.mode_set(InsertionMode::AfterAfterBody);
                }
                return ProcessResult::Done;
            }
            Token::Eof => return self.stop_parsing_pub(),
            _ => {}
        }
        self.unexpected(&token);
        ProcessResult::Reprocess(InsertionMode::InBody, token)
    }

    //§ parsing-main-inframeset
    fn step_in_frameset(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return self.append_text(text);
            }
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "frameset" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_element_for(tag);
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "frameset" => {
                if self.open_elems_len() == 1 {
                    self.unexpected(&token);
                } else {
                    self.pop();
                    if !self.is_fragment() && !self.current_node_named("frameset") {
                        self.mode_set(InsertionMode::AfterFrameset);
                    }
                }
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "frame" => {
                let Token::Tag(tag) = token else { unreachable!() };
                self.insert_and_pop_element_for(tag);
                return ProcessResult::DoneAckSelfClosing;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "noframes" => {
                return self.step(InsertionMode::InHead, token);
            }
            Token::Eof => {
                if self.open_elems_len() != 1 {
                    self.unexpected(&token);
                }
                return self.stop_parsing_pub();
            }
            _ => {}
        }
        self.unexpected(&token)
    }

    //§ parsing-main-afterframeset
    fn step_after_frameset(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return self.append_text(text);
            }
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Tag(tag) if tag.kind == TagKind::EndTag && tag.name.as_str() == "html" => {
                self.mode_set(InsertionMode::AfterAfterFrameset);
                return ProcessResult::Done;
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "noframes" => {
                return self.step(InsertionMode::InHead, token);
            }
            Token::Eof => return self.stop_parsing_pub(),
            _ => {}
        }
        self.unexpected(&token)
    }

    //§ the-after-after-body-insertion-mode
    fn step_after_after_body(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return self.step(InsertionMode::InBody, token),
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment_to_doc(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Eof => return self.stop_parsing_pub(),
            _ => {}
        }
        self.unexpected(&token);
        ProcessResult::Reprocess(InsertionMode::InBody, token)
    }

    //§ the-after-after-frameset-insertion-mode
    fn step_after_after_frameset(&self, token: Token) -> ProcessResult<Sink::Handle> {
        match &token {
            Token::Characters(SplitStatus::NotSplit, _) => {
                let Token::Characters(_, text) = token else { unreachable!() };
                return ProcessResult::SplitWhitespace(text);
            }
            Token::Characters(SplitStatus::Whitespace, _) => return self.step(InsertionMode::InBody, token),
            Token::Comment(_) => {
                let Token::Comment(text) = token else { unreachable!() };
                return self.append_comment_to_doc(text);
            }
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "html" => {
                return self.step(InsertionMode::InBody, token);
            }
            Token::Eof => return self.stop_parsing_pub(),
            Token::Tag(tag) if tag.kind == TagKind::StartTag && tag.name.as_str() == "noframes" => {
                return self.step(InsertionMode::InHead, token);
            }
            _ => {}
        }
        self.unexpected(&token)
    }

    //§ entering-foreign-content-from-in-body
    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody>
    /// (the `<math>`/`<svg>` start-tag arms)
    fn enter_foreign(&self, mut tag: Tag, ns: Namespace) -> ProcessResult<Sink::Handle> {
        match ns {
            Namespace::MathMl => foreign::adjust_mathml_attributes(&mut tag),
            Namespace::Svg => foreign::adjust_svg_attributes(&mut tag),
            _ => {}
        }
        foreign::adjust_foreign_attributes(&mut tag);
        if tag.self_closing {
            self.insert_element_ns(false, ns, tag.name, tag.attrs);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element_ns(true, ns, tag.name, tag.attrs);
            ProcessResult::Done
        }
    }

    //§ misc-helpers
    fn close_p_element_in_button_scope(&self) {
        if self.has_in_button_scope("p") {
            self.close_p_element_pub();
        }
    }

    fn in_html_elem_named(&self, name: &str) -> bool {
        self.open_elems_ref().contains_named(name)
    }

    fn has_in_default_scope(&self, name: &str) -> bool {
        self.open_elems_ref().has_in_scope(name)
    }

    fn has_any_in_default_scope(&self, names: &[&str]) -> bool {
        self.open_elems_ref().has_one_of_in_scope(names)
    }

    fn has_any_in_scope(&self, names: &[&str], scope: &[&str]) -> bool {
        self.open_elems_ref().has_any_in_scope(names, scope)
    }

    fn has_in_button_scope(&self, name: &str) -> bool {
        self.open_elems_ref().has_in_button_scope(name)
    }

    fn has_in_list_item_scope(&self, name: &str) -> bool {
        self.open_elems_ref().has_in_list_item_scope(name)
    }

    fn has_in_table_scope(&self, name: &str) -> bool {
        self.open_elems_ref().has_in_table_scope(name)
    }

    fn has_in_select_scope(&self, name: &str) -> bool {
        self.open_elems_ref().has_in_select_scope(name)
    }

    fn pop_until_current(&self, set: &[&str]) {
        self.open_elems_mut().pop_until(|n| tag_sets::contains(set, n));
    }

    /// Pops the stack, reporting a parse error unless exactly one element
    /// (the expected one) came off.
    fn expect_to_close(&self, name: &str) {
        let mut popped = 0;
        loop {
            popped += 1;
            match self.open_elems_mut().pop() {
                None => break,
                Some(entry) if entry.name.as_str() == name => break,
                Some(_) => {}
            }
        }
        if popped != 1 {
            self.sink.parse_error(Borrowed("Unexpected open element while closing"));
        }
    }

    fn create_formatting_element_for(&self, tag: Tag) -> Sink::Handle {
        let elem = self.insert_element_ns(true, Namespace::Html, tag.name.clone(), tag.attrs.clone());
        self.push_formatting_for_pub(elem.clone(), tag);
        elem
    }

    fn handle_misnested_a_tags(&self, tag: &Tag) {
        let node = {
            let formatting = self.active_formatting_ref();
            match formatting.last_element_named("a") {
                Some((_, h, _)) => h.clone(),
                None => return,
            }
        };
        self.unexpected(tag);
        self.adoption_agency_pub("a");
        if let Some(pos) = self.position_in_active_formatting_pub(&node) {
            self.active_formatting_mut().remove(pos);
        }
        self.open_elems_remove(&node);
    }

    fn end_tag_form(&self) -> ProcessResult<Sink::Handle> {
        if !self.in_html_elem_named("template") {
            let Some(node) = self.take_form_elem() else {
                self.sink.parse_error(Borrowed("Null form element pointer on </form>"));
                return ProcessResult::Done;
            };
            if !self.has_in_scope_handle_pub(&node) {
                self.sink.parse_error(Borrowed("Form element not in scope on </form>"));
                return ProcessResult::Done;
            }
            self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
            let current = self.current_node_pub();
            self.open_elems_remove(&node);
            if current != node {
                self.sink.parse_error(Borrowed("Bad open element on </form>"));
            }
        } else {
            if !self.has_in_default_scope("form") {
                self.sink.parse_error(Borrowed("Form element not in scope on </form>"));
                return ProcessResult::Done;
            }
            self.generate_implied_end_tags(tag_sets::CURSORY_IMPLIED_END);
            if !self.current_node_named("form") {
                self.sink.parse_error(Borrowed("Bad open element on </form>"));
            }
            self.open_elems_mut().pop_until_named("form");
        }
        ProcessResult::Done
    }

    fn check_body_end(&self) {
        const OK_AT_BODY_END: &[&str] = &[
            "dd", "dt", "li", "optgroup", "option", "p", "rp", "rt", "tbody", "td", "tfoot", "th", "thead", "tr",
            "body", "html",
        ];
        let open = self.open_elems_ref();
        for entry in open.iter() {
            if entry.ns == Namespace::Html && tag_sets::contains(OK_AT_BODY_END, entry.name.as_str()) {
                continue;
            }
            self.sink.parse_error(Borrowed("Unexpected open tag at end of body"));
            return;
        }
    }

    fn body_elem(&self) -> Option<Sink::Handle> {
        let open = self.open_elems_ref();
        if open.len() <= 1 {
            return None;
        }
        let entry = open.get(1)?;
        if entry.ns == Namespace::Html && entry.name.as_str() == "body" {
            Some(entry.handle.clone())
        } else {
            None
        }
    }

    // A few accessors over private `TreeBuilder` fields that `mod.rs` keeps
    // internal to itself; exposed here so the per-mode rules above (and
    // `foreign.rs`'s `_impl`-suffixed calls) don't need `pub(crate)` fields.
    fn opts_iframe_srcdoc(&self) -> bool {
        self.opts_ref().iframe_srcdoc
    }

    fn opts_scripting_enabled(&self) -> bool {
        self.opts_ref().scripting_enabled
    }

    fn open_elems_len_impl(&self) -> usize {
        self.open_elems_ref().len()
    }

    fn open_elems_pop_impl(&self) {
        self.open_elems_mut().pop();
    }

    fn open_elems_truncate_impl(&self, len: usize) {
        self.open_elems_mut().truncate(len);
    }

    fn open_elems_handle_at_impl(&self, index: usize) -> Sink::Handle {
        self.open_elems_ref().get(index).expect("index out of range").handle.clone()
    }

    fn mode_get_impl(&self) -> InsertionMode {
        self.mode_get()
    }

    fn frameset_not_ok_impl(&self) {
        self.frameset_ok_set(false);
    }
}
