//! The HTML5 tokenizer: the 80-odd state machine in
//! <https://html.spec.whatwg.org/multipage/parsing.html#tokenization>.
//!
//! Grounded in `html5ever::tokenizer`, trimmed of its SIMD fast path and
//! per-state profiling (not named by `spec.md`'s tokenizer module) and
//! rebuilt against `webparse_core`'s atom/entity types in place of
//! `string_cache`'s `LocalName` and the teacher's in-crate named-entity
//! table.

mod char_ref;
pub mod interface;
pub mod states;

pub use interface::{Doctype, Tag, TagKind, Token, TokenSink, TokenSinkResult};

use std::borrow::Cow::{self, Borrowed};
use std::cell::{Cell, RefCell, RefMut};
use std::mem;

use log::trace;
use tendril::StrTendril;
use webparse_core::atom::TagName;
use webparse_core::buffer_queue::{BufferQueue, SetResult::FromSet, SetResult::NotFromSet};
use webparse_core::qualname::{Attribute, QualName};
use webparse_core::small_char_set;

use self::char_ref::CharRefTokenizer;
use self::interface::TagKind::{EndTag, StartTag};
use self::states::{DoctypeIdKind, RawKind, ScriptEscapeKind, State};

fn lower_ascii_letter(c: char) -> Option<char> {
    match c {
        'a'..='z' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn option_push(opt_str: &mut Option<StrTendril>, c: char) {
    match *opt_str {
        Some(ref mut s) => s.push_char(c),
        None => *opt_str = Some(StrTendril::from_char(c)),
    }
}

/// Tokenizer options. See [SUPPLEMENT] Configuration for the full field list;
/// `last_start_tag_name` and `initial_state` exist for the fragment-parsing
/// and test-runner cases only.
#[derive(Clone, Default)]
pub struct TokenizerOpts {
    pub exact_errors: bool,
    pub discard_bom: bool,
    pub initial_state: Option<State>,
    pub last_start_tag_name: Option<String>,
}

pub enum ProcessResult {
    Continue,
    Suspend,
}

/// The HTML tokenizer. Drives a [`TokenSink`] synchronously; all internal
/// mutable state lives behind `Cell`/`RefCell` so `step` can take `&self`,
/// matching the teacher's interior-mutability style (the tree builder holds
/// a `&Tokenizer` at the same time it holds `&mut self`).
pub struct Tokenizer<Sink> {
    opts: TokenizerOpts,
    pub sink: Sink,

    state: Cell<State>,
    at_eof: Cell<bool>,
    char_ref_tokenizer: RefCell<Option<Box<CharRefTokenizer>>>,

    current_char: Cell<char>,
    reconsume: Cell<bool>,
    ignore_lf: Cell<bool>,
    discard_bom: Cell<bool>,

    current_tag_kind: Cell<TagKind>,
    current_tag_name: RefCell<StrTendril>,
    current_tag_self_closing: Cell<bool>,
    current_tag_attrs: RefCell<Vec<Attribute>>,

    current_attr_name: RefCell<StrTendril>,
    current_attr_value: RefCell<StrTendril>,

    current_comment: RefCell<StrTendril>,
    current_doctype: RefCell<Doctype>,

    last_start_tag_name: RefCell<Option<TagName>>,
    temp_buf: RefCell<StrTendril>,

    current_line: Cell<u64>,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    pub fn new(sink: Sink, mut opts: TokenizerOpts) -> Tokenizer<Sink> {
        let start_tag_name = opts.last_start_tag_name.take().map(|s| TagName::from_static(leak(s)));
        let state = opts.initial_state.unwrap_or(State::Data);
        let discard_bom = opts.discard_bom;
        Tokenizer {
            opts,
            sink,
            state: Cell::new(state),
            char_ref_tokenizer: RefCell::new(None),
            at_eof: Cell::new(false),
            current_char: Cell::new('\0'),
            reconsume: Cell::new(false),
            ignore_lf: Cell::new(false),
            discard_bom: Cell::new(discard_bom),
            current_tag_kind: Cell::new(StartTag),
            current_tag_name: RefCell::new(StrTendril::new()),
            current_tag_self_closing: Cell::new(false),
            current_tag_attrs: RefCell::new(vec![]),
            current_attr_name: RefCell::new(StrTendril::new()),
            current_attr_value: RefCell::new(StrTendril::new()),
            current_comment: RefCell::new(StrTendril::new()),
            current_doctype: RefCell::new(Doctype::default()),
            last_start_tag_name: RefCell::new(start_tag_name),
            temp_buf: RefCell::new(StrTendril::new()),
            current_line: Cell::new(1),
        }
    }

    /// Feed an input string into the tokenizer. Returns once the input queue
    /// is drained (the caller should `feed` again once more bytes decode).
    pub fn feed(&self, input: &BufferQueue) {
        if input.is_empty() {
            return;
        }
        if self.discard_bom.get() {
            self.discard_bom.set(false);
            if let Some(c) = input.peek() {
                if c == '\u{feff}' {
                    input.next();
                }
            } else {
                return;
            }
        }
        self.run(input);
    }

    pub fn set_plaintext_state(&self) {
        self.state.set(State::Plaintext);
    }

    fn process_token(&self, token: Token) -> TokenSinkResult {
        self.sink.process_token(token)
    }

    fn process_token_and_continue(&self, token: Token) {
        assert!(matches!(self.process_token(token), TokenSinkResult::Continue));
    }

    fn get_preprocessed_char(&self, mut c: char, input: &BufferQueue) -> Option<char> {
        if self.ignore_lf.get() {
            self.ignore_lf.set(false);
            if c == '\n' {
                c = input.next()?;
            }
        }
        if c == '\r' {
            self.ignore_lf.set(true);
            c = '\n';
        }
        if c == '\n' {
            self.current_line.set(self.current_line.get() + 1);
        }

        // `char` is a Unicode scalar value by construction, so a lone
        // surrogate can never reach here; only noncharacters and the
        // disallowed control range need checking.
        if self.opts.exact_errors
            && match c as u32 {
                0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F..=0x9F | 0xFDD0..=0xFDEF => true,
                n if (n & 0xFFFE) == 0xFFFE => true,
                _ => false,
            }
        {
            self.emit_error(Borrowed("input-stream contained a noncharacter or disallowed control character"));
        }

        trace!("got character {c}");
        self.current_char.set(c);
        Some(c)
    }

    fn get_char(&self, input: &BufferQueue) -> Option<char> {
        if self.reconsume.get() {
            self.reconsume.set(false);
            Some(self.current_char.get())
        } else {
            input.next().and_then(|c| self.get_preprocessed_char(c, input))
        }
    }

    fn peek(&self, input: &BufferQueue) -> Option<char> {
        if self.reconsume.get() {
            Some(self.current_char.get())
        } else {
            input.peek()
        }
    }

    fn discard_char(&self, input: &BufferQueue) {
        if self.reconsume.get() {
            self.reconsume.set(false);
        } else {
            input.next();
        }
    }

    fn pop_except_from(
        &self,
        input: &BufferQueue,
        set: webparse_core::small_char_set::SmallCharSet,
    ) -> Option<webparse_core::buffer_queue::SetResult> {
        if self.reconsume.get() || self.ignore_lf.get() {
            return self.get_char(input).map(FromSet);
        }
        match input.pop_except_from(set) {
            Some(FromSet(c)) => self.get_preprocessed_char(c, input).map(FromSet),
            other => other,
        }
    }

    fn eat(&self, input: &BufferQueue, pat: &str, eq: fn(&u8, &u8) -> bool) -> Option<bool> {
        if self.ignore_lf.get() {
            self.ignore_lf.set(false);
            if self.peek(input) == Some('\n') {
                self.discard_char(input);
            }
        }
        input.push_front(mem::take(&mut self.temp_buf.borrow_mut()));
        match input.eat(pat, eq) {
            None if self.at_eof.get() => Some(false),
            None => {
                while let Some(c) = input.next() {
                    self.temp_buf.borrow_mut().push_char(c);
                }
                None
            }
            Some(matched) => Some(matched),
        }
    }

    fn run(&self, input: &BufferQueue) {
        loop {
            match self.step(input) {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => return,
            }
        }
    }

    fn bad_char_error(&self) {
        let msg = if self.opts.exact_errors {
            Cow::from("Bad character")
        } else {
            let c = self.current_char.get();
            let state = self.state.get();
            Cow::from(format!("Saw {c:?} in state {state:?}"))
        };
        self.emit_error(msg);
    }

    fn bad_eof_error(&self) {
        let msg = if self.opts.exact_errors {
            Cow::from("Unexpected EOF")
        } else {
            Cow::from(format!("Saw EOF in state {:?}", self.state.get()))
        };
        self.emit_error(msg);
    }

    fn emit_char(&self, c: char) {
        self.process_token_and_continue(match c {
            '\0' => Token::NullCharacterToken,
            _ => Token::CharacterTokens(StrTendril::from_char(c)),
        });
    }

    fn emit_chars(&self, b: StrTendril) {
        self.process_token_and_continue(Token::CharacterTokens(b));
    }

    fn emit_current_tag(&self) -> ProcessResult {
        self.finish_attribute();

        let name = TagName::new(self.current_tag_name.borrow().clone());
        self.current_tag_name.borrow_mut().clear();

        match self.current_tag_kind.get() {
            StartTag => {
                *self.last_start_tag_name.borrow_mut() = Some(name.clone());
            }
            EndTag => {
                if !self.current_tag_attrs.borrow().is_empty() {
                    self.emit_error(Borrowed("Attributes on an end tag"));
                }
                if self.current_tag_self_closing.get() {
                    self.emit_error(Borrowed("Self-closing end tag"));
                }
            }
        }

        let token = Token::TagToken(Tag {
            kind: self.current_tag_kind.get(),
            name,
            self_closing: self.current_tag_self_closing.get(),
            attrs: mem::take(&mut self.current_tag_attrs.borrow_mut()),
        });

        match self.process_token(token) {
            TokenSinkResult::Continue => ProcessResult::Continue,
            TokenSinkResult::Plaintext => {
                self.state.set(State::Plaintext);
                ProcessResult::Continue
            }
            TokenSinkResult::RawData(kind) => {
                self.state.set(State::RawData(kind));
                ProcessResult::Continue
            }
            TokenSinkResult::EncodingIndicator(_) => ProcessResult::Continue,
        }
    }

    fn emit_temp_buf(&self) {
        let buf = mem::take(&mut *self.temp_buf.borrow_mut());
        self.emit_chars(buf);
    }

    fn clear_temp_buf(&self) {
        self.temp_buf.borrow_mut().clear();
    }

    fn emit_current_comment(&self) {
        let comment = mem::take(&mut *self.current_comment.borrow_mut());
        self.process_token_and_continue(Token::CommentToken(comment));
    }

    fn discard_tag(&self) {
        self.current_tag_name.borrow_mut().clear();
        self.current_tag_self_closing.set(false);
        *self.current_tag_attrs.borrow_mut() = vec![];
    }

    fn create_tag(&self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_name.borrow_mut().push_char(c);
        self.current_tag_kind.set(kind);
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name.borrow().as_ref() {
            Some(last) => {
                self.current_tag_kind.get() == EndTag
                    && &*self.current_tag_name.borrow() == last.as_str()
            }
            None => false,
        }
    }

    fn create_attribute(&self, c: char) {
        self.finish_attribute();
        self.current_attr_name.borrow_mut().push_char(c);
    }

    fn finish_attribute(&self) {
        if self.current_attr_name.borrow().is_empty() {
            return;
        }

        let dup = {
            let name = &*self.current_attr_name.borrow();
            self.current_tag_attrs.borrow().iter().any(|a| a.name.local.as_str() == &**name)
        };

        if dup {
            self.emit_error(Borrowed("Duplicate attribute"));
            self.current_attr_name.borrow_mut().clear();
            self.current_attr_value.borrow_mut().clear();
        } else {
            let name = mem::take(&mut *self.current_attr_name.borrow_mut());
            self.current_tag_attrs.borrow_mut().push(Attribute {
                // The tree builder adjusts the namespace for foreign elements.
                name: QualName::attr(webparse_core::atom::AttrName::new(name)),
                value: mem::take(&mut self.current_attr_value.borrow_mut()),
            });
        }
    }

    fn emit_current_doctype(&self) {
        let doctype = self.current_doctype.take();
        self.process_token_and_continue(Token::DoctypeToken(doctype));
    }

    fn doctype_id(&self, kind: DoctypeIdKind) -> RefMut<'_, Option<StrTendril>> {
        let current_doctype = self.current_doctype.borrow_mut();
        match kind {
            DoctypeIdKind::Public => RefMut::map(current_doctype, |d| &mut d.public_id),
            DoctypeIdKind::System => RefMut::map(current_doctype, |d| &mut d.system_id),
        }
    }

    fn clear_doctype_id(&self, kind: DoctypeIdKind) {
        let mut id = self.doctype_id(kind);
        match *id {
            Some(ref mut s) => s.clear(),
            None => *id = Some(StrTendril::new()),
        }
    }

    fn consume_char_ref(&self) {
        *self.char_ref_tokenizer.borrow_mut() =
            Some(Box::new(CharRefTokenizer::new(matches!(self.state.get(), State::AttributeValue(_)))));
    }

    fn emit_eof(&self) {
        self.process_token_and_continue(Token::EofToken);
    }

    fn emit_error(&self, error: Cow<'static, str>) {
        self.process_token_and_continue(Token::ParseError(error));
    }
}

fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

macro_rules! shorthand (
    ( $me:ident : create_tag $kind:expr, $c:expr   ) => ( $me.create_tag($kind, $c)                           );
    ( $me:ident : push_tag $c:expr                 ) => ( $me.current_tag_name.borrow_mut().push_char($c)     );
    ( $me:ident : discard_tag                      ) => ( $me.discard_tag()                                   );
    ( $me:ident : discard_char $input:expr         ) => ( $me.discard_char($input)                            );
    ( $me:ident : push_temp $c:expr                ) => ( $me.temp_buf.borrow_mut().push_char($c)             );
    ( $me:ident : clear_temp                       ) => ( $me.clear_temp_buf()                                );
    ( $me:ident : create_attr $c:expr              ) => ( $me.create_attribute($c)                            );
    ( $me:ident : push_name $c:expr                ) => ( $me.current_attr_name.borrow_mut().push_char($c)    );
    ( $me:ident : push_value $c:expr               ) => ( $me.current_attr_value.borrow_mut().push_char($c)   );
    ( $me:ident : append_value $c:expr             ) => ( $me.current_attr_value.borrow_mut().push_slice($c)  );
    ( $me:ident : push_comment $c:expr             ) => ( $me.current_comment.borrow_mut().push_char($c)      );
    ( $me:ident : append_comment $c:expr           ) => ( $me.current_comment.borrow_mut().push_slice($c)     );
    ( $me:ident : emit_comment                     ) => ( $me.emit_current_comment()                          );
    ( $me:ident : create_doctype                   ) => ( *$me.current_doctype.borrow_mut() = Doctype::default() );
    ( $me:ident : push_doctype_name $c:expr        ) => ( option_push(&mut $me.current_doctype.borrow_mut().name, $c) );
    ( $me:ident : push_doctype_id $k:expr, $c:expr ) => ( option_push(&mut $me.doctype_id($k), $c)            );
    ( $me:ident : clear_doctype_id $k:expr         ) => ( $me.clear_doctype_id($k)                            );
    ( $me:ident : force_quirks                     ) => ( $me.current_doctype.borrow_mut().force_quirks = true);
    ( $me:ident : emit_doctype                     ) => ( $me.emit_current_doctype()                          );
);

macro_rules! go (
    ( $me:ident : $a:tt ; $($rest:tt)* ) => ({ shorthand!($me: $a); go!($me: $($rest)*); });

    ( $me:ident : to $s:expr ) => ({ $me.state.set($s); return ProcessResult::Continue; });
    ( $me:ident : reconsume $s:expr ) => ({ $me.reconsume.set(true); go!($me: to $s); });
    ( $me:ident : consume_char_ref ) => ({ $me.consume_char_ref(); return ProcessResult::Continue; });
    ( $me:ident : emit_tag $s:expr ) => ({ $me.state.set($s); return $me.emit_current_tag(); });
    ( $me:ident : eof ) => ({ $me.emit_eof(); return ProcessResult::Suspend; });

    ( $me:ident : $($cmd:tt)+ ) => ( shorthand!($me: $($cmd)+) );
    ( $me:ident : ) => (());
);

macro_rules! get_char ( ($me:expr, $input:expr) => (
    match $me.get_char($input) { Some(c) => c, None => return ProcessResult::Suspend }
));

macro_rules! peek ( ($me:expr, $input:expr) => (
    match $me.peek($input) { Some(c) => c, None => return ProcessResult::Suspend }
));

macro_rules! pop_except_from ( ($me:expr, $input:expr, $set:expr) => (
    match $me.pop_except_from($input, $set) { Some(r) => r, None => return ProcessResult::Suspend }
));

macro_rules! eat ( ($me:expr, $input:expr, $pat:expr) => (
    match $me.eat($input, $pat, u8::eq_ignore_ascii_case) { Some(b) => b, None => return ProcessResult::Suspend }
));

macro_rules! eat_exact ( ($me:expr, $input:expr, $pat:expr) => (
    match $me.eat($input, $pat, u8::eq) { Some(b) => b, None => return ProcessResult::Suspend }
));

impl<Sink: TokenSink> Tokenizer<Sink> {
    #[allow(clippy::never_loop)]
    fn step(&self, input: &BufferQueue) -> ProcessResult {
        if self.char_ref_tokenizer.borrow().is_some() {
            return self.step_char_ref_tokenizer(input);
        }

        trace!("processing in state {:?}", self.state.get());
        match self.state.get() {
            State::Data => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\0');
                    }
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('<') => go!(self: to State::TagOpen),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::RawData(RawKind::Rcdata) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    }
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('<') => go!(self: to State::RawLessThanSign(RawKind::Rcdata)),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::RawData(RawKind::Rawtext) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    }
                    FromSet('<') => go!(self: to State::RawLessThanSign(RawKind::Rawtext)),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::RawData(RawKind::ScriptData) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    }
                    FromSet('<') => go!(self: to State::RawLessThanSign(RawKind::ScriptData)),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::RawData(RawKind::ScriptDataEscaped(kind)) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '-' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    }
                    FromSet('-') => {
                        self.emit_char('-');
                        go!(self: to State::ScriptDataEscapedDash(kind));
                    }
                    FromSet('<') => go!(self: to State::RawLessThanSign(RawKind::ScriptDataEscaped(kind))),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::Plaintext => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    }
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            State::TagOpen => loop {
                match get_char!(self, input) {
                    '!' => go!(self: to State::MarkupDeclarationOpen),
                    '/' => go!(self: to State::EndTagOpen),
                    '?' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().clear();
                        go!(self: reconsume State::BogusComment)
                    }
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag StartTag, cl; to State::TagName),
                        None => {
                            self.bad_char_error();
                            self.emit_char('<');
                            go!(self: reconsume State::Data)
                        }
                    },
                }
            },

            State::EndTagOpen => loop {
                match get_char!(self, input) {
                    '>' => {
                        self.bad_char_error();
                        go!(self: to State::Data)
                    }
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag EndTag, cl; to State::TagName),
                        None => {
                            self.bad_char_error();
                            self.current_comment.borrow_mut().clear();
                            go!(self: reconsume State::BogusComment)
                        }
                    },
                }
            },

            State::TagName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::BeforeAttributeName),
                    '/' => go!(self: to State::SelfClosingStartTag),
                    '>' => go!(self: emit_tag State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_tag '\u{fffd}')
                    }
                    c => go!(self: push_tag (c.to_ascii_lowercase())),
                }
            },

            State::RawLessThanSign(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)) => loop {
                match get_char!(self, input) {
                    '/' => go!(self: clear_temp; to State::RawEndTagOpen(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped))),
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: clear_temp; push_temp cl);
                            self.emit_char('<');
                            self.emit_char(c);
                            go!(self: to State::ScriptDataEscapeStart(ScriptEscapeKind::DoubleEscaped));
                        }
                        None => {
                            self.emit_char('<');
                            go!(self: reconsume State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)));
                        }
                    },
                }
            },

            State::RawLessThanSign(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)) => loop {
                match get_char!(self, input) {
                    '/' => {
                        go!(self: clear_temp);
                        self.emit_char('/');
                        go!(self: to State::ScriptDataDoubleEscapeEnd);
                    }
                    _ => go!(self: reconsume State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped))),
                }
            },

            State::RawLessThanSign(kind) => loop {
                match get_char!(self, input) {
                    '/' => go!(self: clear_temp; to State::RawEndTagOpen(kind)),
                    '!' if kind == RawKind::ScriptData => {
                        self.emit_char('<');
                        self.emit_char('!');
                        go!(self: to State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped));
                    }
                    _ => {
                        self.emit_char('<');
                        go!(self: reconsume State::RawData(kind));
                    }
                }
            },

            State::RawEndTagOpen(kind) => loop {
                let c = get_char!(self, input);
                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: create_tag EndTag, cl; push_temp c; to State::RawEndTagName(kind)),
                    None => {
                        self.emit_char('<');
                        self.emit_char('/');
                        go!(self: reconsume State::RawData(kind));
                    }
                }
            },

            State::RawEndTagName(kind) => loop {
                let c = get_char!(self, input);
                if self.have_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => go!(self: clear_temp; to State::BeforeAttributeName),
                        '/' => go!(self: clear_temp; to State::SelfClosingStartTag),
                        '>' => go!(self: clear_temp; emit_tag State::Data),
                        _ => (),
                    }
                }
                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: push_tag cl; push_temp c),
                    None => {
                        go!(self: discard_tag);
                        self.emit_char('<');
                        self.emit_char('/');
                        self.emit_temp_buf();
                        go!(self: reconsume State::RawData(kind));
                    }
                }
            },

            State::ScriptDataEscapeStart(ScriptEscapeKind::DoubleEscaped) => loop {
                let c = get_char!(self, input);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            ScriptEscapeKind::DoubleEscaped
                        } else {
                            ScriptEscapeKind::Escaped
                        };
                        self.emit_char(c);
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(esc)));
                    }
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            self.emit_char(c);
                        }
                        None => go!(self: reconsume State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped))),
                    },
                }
            },

            State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped) => loop {
                match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to State::ScriptDataEscapeStartDash);
                    }
                    _ => go!(self: reconsume State::RawData(RawKind::ScriptData)),
                }
            },

            State::ScriptDataEscapeStartDash => loop {
                match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to State::ScriptDataEscapedDashDash(ScriptEscapeKind::Escaped));
                    }
                    _ => go!(self: reconsume State::RawData(RawKind::ScriptData)),
                }
            },

            State::ScriptDataEscapedDash(kind) => loop {
                match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to State::ScriptDataEscapedDashDash(kind));
                    }
                    '<' => {
                        if kind == ScriptEscapeKind::DoubleEscaped {
                            self.emit_char('<');
                        }
                        go!(self: to State::RawLessThanSign(RawKind::ScriptDataEscaped(kind)));
                    }
                    '\0' => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(kind)))
                    }
                    c => {
                        self.emit_char(c);
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(kind)));
                    }
                }
            },

            State::ScriptDataEscapedDashDash(kind) => loop {
                match get_char!(self, input) {
                    '-' => self.emit_char('-'),
                    '<' => {
                        if kind == ScriptEscapeKind::DoubleEscaped {
                            self.emit_char('<');
                        }
                        go!(self: to State::RawLessThanSign(RawKind::ScriptDataEscaped(kind)));
                    }
                    '>' => {
                        self.emit_char('>');
                        go!(self: to State::RawData(RawKind::ScriptData));
                    }
                    '\0' => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(kind)))
                    }
                    c => {
                        self.emit_char(c);
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(kind)));
                    }
                }
            },

            State::ScriptDataDoubleEscapeEnd => loop {
                let c = get_char!(self, input);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            ScriptEscapeKind::Escaped
                        } else {
                            ScriptEscapeKind::DoubleEscaped
                        };
                        self.emit_char(c);
                        go!(self: to State::RawData(RawKind::ScriptDataEscaped(esc)));
                    }
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            self.emit_char(c);
                        }
                        None => go!(self: reconsume State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped))),
                    },
                }
            },

            State::BeforeAttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to State::SelfClosingStartTag),
                    '>' => go!(self: emit_tag State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: create_attr '\u{fffd}'; to State::AttributeName)
                    }
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to State::AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<' | '=') {
                                self.bad_char_error();
                            }
                            go!(self: create_attr c; to State::AttributeName);
                        }
                    },
                }
            },

            State::AttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::AfterAttributeName),
                    '/' => go!(self: to State::SelfClosingStartTag),
                    '=' => go!(self: to State::BeforeAttributeValue),
                    '>' => go!(self: emit_tag State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_name '\u{fffd}')
                    }
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: push_name cl),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                self.bad_char_error();
                            }
                            go!(self: push_name c);
                        }
                    },
                }
            },

            State::AfterAttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to State::SelfClosingStartTag),
                    '=' => go!(self: to State::BeforeAttributeValue),
                    '>' => go!(self: emit_tag State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: create_attr '\u{fffd}'; to State::AttributeName)
                    }
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to State::AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                self.bad_char_error();
                            }
                            go!(self: create_attr c; to State::AttributeName);
                        }
                    },
                }
            },

            State::BeforeAttributeValue => loop {
                match peek!(self, input) {
                    '\t' | '\n' | '\r' | '\x0C' | ' ' => go!(self: discard_char input),
                    '"' => go!(self: discard_char input; to State::AttributeValue(states::AttrValueKind::DoubleQuoted)),
                    '\'' => go!(self: discard_char input; to State::AttributeValue(states::AttrValueKind::SingleQuoted)),
                    '>' => {
                        go!(self: discard_char input);
                        self.bad_char_error();
                        go!(self: emit_tag State::Data)
                    }
                    _ => go!(self: to State::AttributeValue(states::AttrValueKind::Unquoted)),
                }
            },

            State::AttributeValue(states::AttrValueKind::DoubleQuoted) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '"' '&' '\0' '\n')) {
                    FromSet('"') => go!(self: to State::AfterAttributeValueQuoted),
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('\0') => {
                        self.bad_char_error();
                        go!(self: push_value '\u{fffd}')
                    }
                    FromSet(c) => go!(self: push_value c),
                    NotFromSet(ref b) => go!(self: append_value b),
                }
            },

            State::AttributeValue(states::AttrValueKind::SingleQuoted) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\'' '&' '\0' '\n')) {
                    FromSet('\'') => go!(self: to State::AfterAttributeValueQuoted),
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('\0') => {
                        self.bad_char_error();
                        go!(self: push_value '\u{fffd}')
                    }
                    FromSet(c) => go!(self: push_value c),
                    NotFromSet(ref b) => go!(self: append_value b),
                }
            },

            State::AttributeValue(states::AttrValueKind::Unquoted) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\t' '\n' '\x0C' ' ' '&' '>' '\0')) {
                    FromSet('\t') | FromSet('\n') | FromSet('\x0C') | FromSet(' ') => go!(self: to State::BeforeAttributeName),
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('>') => go!(self: emit_tag State::Data),
                    FromSet('\0') => {
                        self.bad_char_error();
                        go!(self: push_value '\u{fffd}')
                    }
                    FromSet(c) => {
                        if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            self.bad_char_error();
                        }
                        go!(self: push_value c);
                    }
                    NotFromSet(ref b) => go!(self: append_value b),
                }
            },

            State::AfterAttributeValueQuoted => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::BeforeAttributeName),
                    '/' => go!(self: to State::SelfClosingStartTag),
                    '>' => go!(self: emit_tag State::Data),
                    _ => {
                        self.bad_char_error();
                        go!(self: reconsume State::BeforeAttributeName)
                    }
                }
            },

            State::SelfClosingStartTag => loop {
                match get_char!(self, input) {
                    '>' => {
                        self.current_tag_self_closing.set(true);
                        go!(self: emit_tag State::Data);
                    }
                    _ => {
                        self.bad_char_error();
                        go!(self: reconsume State::BeforeAttributeName)
                    }
                }
            },

            State::CommentStart => loop {
                match get_char!(self, input) {
                    '-' => go!(self: to State::CommentStartDash),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_comment '\u{fffd}'; to State::Comment)
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: emit_comment; to State::Data)
                    }
                    c => go!(self: push_comment c; to State::Comment),
                }
            },

            State::CommentStartDash => loop {
                match get_char!(self, input) {
                    '-' => go!(self: to State::CommentEnd),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: append_comment "-\u{fffd}"; to State::Comment)
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: emit_comment; to State::Data)
                    }
                    c => go!(self: push_comment '-'; push_comment c; to State::Comment),
                }
            },

            State::Comment => loop {
                match get_char!(self, input) {
                    c @ '<' => go!(self: push_comment c; to State::CommentLessThanSign),
                    '-' => go!(self: to State::CommentEndDash),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_comment '\u{fffd}')
                    }
                    c => go!(self: push_comment c),
                }
            },

            State::CommentLessThanSign => loop {
                match get_char!(self, input) {
                    c @ '!' => go!(self: push_comment c; to State::CommentLessThanSignBang),
                    c @ '<' => go!(self: push_comment c),
                    _ => go!(self: reconsume State::Comment),
                }
            },

            State::CommentLessThanSignBang => loop {
                match get_char!(self, input) {
                    '-' => go!(self: to State::CommentLessThanSignBangDash),
                    _ => go!(self: reconsume State::Comment),
                }
            },

            State::CommentLessThanSignBangDash => loop {
                match get_char!(self, input) {
                    '-' => go!(self: to State::CommentLessThanSignBangDashDash),
                    _ => go!(self: reconsume State::CommentEndDash),
                }
            },

            State::CommentLessThanSignBangDashDash => loop {
                match get_char!(self, input) {
                    '>' => go!(self: reconsume State::CommentEnd),
                    _ => {
                        self.bad_char_error();
                        go!(self: reconsume State::CommentEnd)
                    }
                }
            },

            State::CommentEndDash => loop {
                match get_char!(self, input) {
                    '-' => go!(self: to State::CommentEnd),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: append_comment "-\u{fffd}"; to State::Comment)
                    }
                    c => go!(self: push_comment '-'; push_comment c; to State::Comment),
                }
            },

            State::CommentEnd => loop {
                match get_char!(self, input) {
                    '>' => go!(self: emit_comment; to State::Data),
                    '!' => go!(self: to State::CommentEndBang),
                    '-' => go!(self: push_comment '-'),
                    _ => go!(self: append_comment "--"; reconsume State::Comment),
                }
            },

            State::CommentEndBang => loop {
                match get_char!(self, input) {
                    '-' => go!(self: append_comment "--!"; to State::CommentEndDash),
                    '>' => {
                        self.bad_char_error();
                        go!(self: emit_comment; to State::Data)
                    }
                    '\0' => {
                        self.bad_char_error();
                        go!(self: append_comment "--!\u{fffd}"; to State::Comment)
                    }
                    c => go!(self: append_comment "--!"; push_comment c; to State::Comment),
                }
            },

            State::Doctype => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::BeforeDoctypeName),
                    '>' => go!(self: reconsume State::BeforeDoctypeName),
                    _ => {
                        self.bad_char_error();
                        go!(self: reconsume State::BeforeDoctypeName)
                    }
                }
            },

            State::BeforeDoctypeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: create_doctype; push_doctype_name '\u{fffd}'; to State::DoctypeName)
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: create_doctype; force_quirks; emit_doctype; to State::Data)
                    }
                    c => go!(self: create_doctype; push_doctype_name (c.to_ascii_lowercase()); to State::DoctypeName),
                }
            },

            State::DoctypeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::AfterDoctypeName),
                    '>' => go!(self: emit_doctype; to State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_doctype_name '\u{fffd}')
                    }
                    c => go!(self: push_doctype_name (c.to_ascii_lowercase())),
                }
            },

            State::AfterDoctypeName => loop {
                if eat!(self, input, "public") {
                    go!(self: to State::AfterDoctypeKeyword(DoctypeIdKind::Public));
                } else if eat!(self, input, "system") {
                    go!(self: to State::AfterDoctypeKeyword(DoctypeIdKind::System));
                } else {
                    match get_char!(self, input) {
                        '\t' | '\n' | '\x0C' | ' ' => (),
                        '>' => go!(self: emit_doctype; to State::Data),
                        _ => {
                            self.bad_char_error();
                            go!(self: force_quirks; reconsume State::BogusDoctype)
                        }
                    }
                }
            },

            State::AfterDoctypeKeyword(kind) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::BeforeDoctypeIdentifier(kind)),
                    '"' => {
                        self.bad_char_error();
                        go!(self: clear_doctype_id kind; to State::DoctypeIdentifierDoubleQuoted(kind))
                    }
                    '\'' => {
                        self.bad_char_error();
                        go!(self: clear_doctype_id kind; to State::DoctypeIdentifierSingleQuoted(kind))
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: force_quirks; emit_doctype; to State::Data)
                    }
                    _ => {
                        self.bad_char_error();
                        go!(self: force_quirks; reconsume State::BogusDoctype)
                    }
                }
            },

            State::BeforeDoctypeIdentifier(kind) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => go!(self: clear_doctype_id kind; to State::DoctypeIdentifierDoubleQuoted(kind)),
                    '\'' => go!(self: clear_doctype_id kind; to State::DoctypeIdentifierSingleQuoted(kind)),
                    '>' => {
                        self.bad_char_error();
                        go!(self: force_quirks; emit_doctype; to State::Data)
                    }
                    _ => {
                        self.bad_char_error();
                        go!(self: force_quirks; reconsume State::BogusDoctype)
                    }
                }
            },

            State::DoctypeIdentifierDoubleQuoted(kind) => loop {
                match get_char!(self, input) {
                    '"' => go!(self: to State::AfterDoctypeIdentifier(kind)),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_doctype_id kind, '\u{fffd}')
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: force_quirks; emit_doctype; to State::Data)
                    }
                    c => go!(self: push_doctype_id kind, c),
                }
            },

            State::DoctypeIdentifierSingleQuoted(kind) => loop {
                match get_char!(self, input) {
                    '\'' => go!(self: to State::AfterDoctypeIdentifier(kind)),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_doctype_id kind, '\u{fffd}')
                    }
                    '>' => {
                        self.bad_char_error();
                        go!(self: force_quirks; emit_doctype; to State::Data)
                    }
                    c => go!(self: push_doctype_id kind, c),
                }
            },

            State::AfterDoctypeIdentifier(DoctypeIdKind::Public) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to State::BetweenDoctypePublicAndSystemIdentifiers),
                    '>' => go!(self: emit_doctype; to State::Data),
                    '"' => {
                        self.bad_char_error();
                        go!(self: clear_doctype_id DoctypeIdKind::System; to State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System))
                    }
                    '\'' => {
                        self.bad_char_error();
                        go!(self: clear_doctype_id DoctypeIdKind::System; to State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System))
                    }
                    _ => {
                        self.bad_char_error();
                        go!(self: force_quirks; reconsume State::BogusDoctype)
                    }
                }
            },

            State::AfterDoctypeIdentifier(DoctypeIdKind::System) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to State::Data),
                    _ => {
                        self.bad_char_error();
                        go!(self: reconsume State::BogusDoctype)
                    }
                }
            },

            State::BetweenDoctypePublicAndSystemIdentifiers => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to State::Data),
                    '"' => go!(self: clear_doctype_id DoctypeIdKind::System; to State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System)),
                    '\'' => go!(self: clear_doctype_id DoctypeIdKind::System; to State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System)),
                    _ => {
                        self.bad_char_error();
                        go!(self: force_quirks; reconsume State::BogusDoctype)
                    }
                }
            },

            State::BogusDoctype => loop {
                match get_char!(self, input) {
                    '>' => go!(self: emit_doctype; to State::Data),
                    '\0' => self.bad_char_error(),
                    _ => (),
                }
            },

            State::BogusComment => loop {
                match get_char!(self, input) {
                    '>' => go!(self: emit_comment; to State::Data),
                    '\0' => {
                        self.bad_char_error();
                        go!(self: push_comment '\u{fffd}')
                    }
                    c => go!(self: push_comment c),
                }
            },

            State::MarkupDeclarationOpen => loop {
                if eat_exact!(self, input, "--") {
                    self.current_comment.borrow_mut().clear();
                    go!(self: to State::CommentStart);
                } else if eat!(self, input, "doctype") {
                    go!(self: to State::Doctype);
                } else {
                    if self.sink.adjusted_current_node_present_but_not_in_html_namespace()
                        && eat_exact!(self, input, "[CDATA[")
                    {
                        go!(self: clear_temp; to State::CdataSection);
                    }
                    self.bad_char_error();
                    self.current_comment.borrow_mut().clear();
                    go!(self: to State::BogusComment);
                }
            },

            State::CdataSection => loop {
                match get_char!(self, input) {
                    ']' => go!(self: to State::CdataSectionBracket),
                    '\0' => {
                        self.emit_temp_buf();
                        self.emit_char('\0');
                    }
                    c => go!(self: push_temp c),
                }
            },

            State::CdataSectionBracket => match get_char!(self, input) {
                ']' => go!(self: to State::CdataSectionEnd),
                _ => go!(self: push_temp ']'; reconsume State::CdataSection),
            },

            State::CdataSectionEnd => loop {
                match get_char!(self, input) {
                    ']' => go!(self: push_temp ']'),
                    '>' => {
                        self.emit_temp_buf();
                        go!(self: to State::Data);
                    }
                    _ => go!(self: push_temp ']'; push_temp ']'; reconsume State::CdataSection),
                }
            },
        }
    }

    fn step_char_ref_tokenizer(&self, input: &BufferQueue) -> ProcessResult {
        let mut tok = self.char_ref_tokenizer.take().unwrap();
        let outcome = tok.step(self, input);

        match outcome {
            char_ref::Status::Done(char_ref) => {
                self.process_char_ref(char_ref);
                ProcessResult::Continue
            }
            char_ref::Status::Stuck => {
                *self.char_ref_tokenizer.borrow_mut() = Some(tok);
                ProcessResult::Suspend
            }
            char_ref::Status::Progress => {
                *self.char_ref_tokenizer.borrow_mut() = Some(tok);
                ProcessResult::Continue
            }
        }
    }

    fn process_char_ref(&self, char_ref: char_ref::CharRef) {
        let char_ref::CharRef { mut chars, mut num_chars } = char_ref;
        if num_chars == 0 {
            chars[0] = '&';
            num_chars = 1;
        }
        for c in chars.iter().take(num_chars as usize).copied() {
            match self.state.get() {
                State::Data | State::RawData(RawKind::Rcdata) => self.emit_char(c),
                State::AttributeValue(_) => go_push_value(self, c),
                other => panic!("state {other:?} should not be reachable in process_char_ref"),
            }
        }
    }

    /// Indicate that the input stream is finished. Flushes any in-progress
    /// character reference, then drains the remaining EOF-state logic.
    pub fn end(&self) {
        let input = BufferQueue::new();
        if let Some(mut tok) = self.char_ref_tokenizer.take() {
            let char_ref = tok.end_of_file(self, &input);
            self.process_char_ref(char_ref);
        }

        self.at_eof.set(true);
        self.run(&input);
        debug_assert!(input.is_empty());

        loop {
            match self.eof_step() {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => break,
            }
        }
    }

    fn eof_step(&self) -> ProcessResult {
        match self.state.get() {
            State::Data
            | State::RawData(RawKind::Rcdata)
            | State::RawData(RawKind::Rawtext)
            | State::RawData(RawKind::ScriptData)
            | State::Plaintext => go!(self: eof),

            State::TagName
            | State::RawData(RawKind::ScriptDataEscaped(_))
            | State::BeforeAttributeName
            | State::AttributeName
            | State::AfterAttributeName
            | State::AttributeValue(_)
            | State::AfterAttributeValueQuoted
            | State::SelfClosingStartTag
            | State::ScriptDataEscapedDash(_)
            | State::ScriptDataEscapedDashDash(_) => {
                self.bad_eof_error();
                go!(self: to State::Data)
            }

            State::BeforeAttributeValue => go!(self: reconsume State::AttributeValue(states::AttrValueKind::Unquoted)),

            State::TagOpen => {
                self.bad_eof_error();
                self.emit_char('<');
                go!(self: to State::Data);
            }

            State::EndTagOpen => {
                self.bad_eof_error();
                self.emit_char('<');
                self.emit_char('/');
                go!(self: to State::Data);
            }

            State::RawLessThanSign(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)) => {
                go!(self: to State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)))
            }

            State::RawLessThanSign(kind) => {
                self.emit_char('<');
                go!(self: to State::RawData(kind));
            }

            State::RawEndTagOpen(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                go!(self: to State::RawData(kind));
            }

            State::RawEndTagName(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                self.emit_temp_buf();
                go!(self: to State::RawData(kind))
            }

            State::ScriptDataEscapeStart(kind) => go!(self: to State::RawData(RawKind::ScriptDataEscaped(kind))),
            State::ScriptDataEscapeStartDash => go!(self: to State::RawData(RawKind::ScriptData)),
            State::ScriptDataDoubleEscapeEnd => {
                go!(self: to State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)))
            }

            State::CommentStart
            | State::CommentStartDash
            | State::Comment
            | State::CommentEndDash
            | State::CommentEnd
            | State::CommentEndBang => {
                self.bad_eof_error();
                go!(self: emit_comment; to State::Data)
            }

            State::CommentLessThanSign | State::CommentLessThanSignBang => go!(self: reconsume State::Comment),
            State::CommentLessThanSignBangDash => go!(self: reconsume State::CommentEndDash),
            State::CommentLessThanSignBangDashDash => go!(self: reconsume State::CommentEnd),

            State::Doctype | State::BeforeDoctypeName => {
                self.bad_eof_error();
                go!(self: create_doctype; force_quirks; emit_doctype; to State::Data)
            }

            State::DoctypeName
            | State::AfterDoctypeName
            | State::AfterDoctypeKeyword(_)
            | State::BeforeDoctypeIdentifier(_)
            | State::DoctypeIdentifierDoubleQuoted(_)
            | State::DoctypeIdentifierSingleQuoted(_)
            | State::AfterDoctypeIdentifier(_)
            | State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.bad_eof_error();
                go!(self: force_quirks; emit_doctype; to State::Data)
            }

            State::BogusDoctype => go!(self: emit_doctype; to State::Data),
            State::BogusComment => go!(self: emit_comment; to State::Data),

            State::MarkupDeclarationOpen => {
                self.bad_char_error();
                go!(self: to State::BogusComment)
            }

            State::CdataSection => {
                self.emit_temp_buf();
                self.bad_eof_error();
                go!(self: to State::Data)
            }

            State::CdataSectionBracket => go!(self: push_temp ']'; to State::CdataSection),
            State::CdataSectionEnd => go!(self: push_temp ']'; push_temp ']'; to State::CdataSection),
        }
    }
}

fn go_push_value<Sink: TokenSink>(me: &Tokenizer<Sink>, c: char) {
    me.current_attr_value.borrow_mut().push_char(c);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CollectingSink {
        tokens: RefCell<Vec<Token>>,
    }

    impl TokenSink for CollectingSink {
        fn process_token(&self, token: Token) -> TokenSinkResult {
            self.tokens.borrow_mut().push(token);
            TokenSinkResult::Continue
        }
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let sink = CollectingSink { tokens: RefCell::new(Vec::new()) };
        let tok = Tokenizer::new(sink, TokenizerOpts::default());
        let buffer = BufferQueue::new();
        buffer.push_back(StrTendril::from(input));
        tok.feed(&buffer);
        tok.end();
        tok.sink.tokens.into_inner()
    }

    #[test]
    fn tokenizes_simple_start_and_end_tag() {
        let tokens = tokenize("<p>hi</p>");
        let tag_names: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::TagToken(tag) => Some(tag.name.as_str().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(tag_names, vec!["p", "p"]);
    }

    #[test]
    fn null_character_becomes_null_character_token() {
        let tokens = tokenize("a\0b");
        assert!(tokens.iter().any(|t| matches!(t, Token::NullCharacterToken)));
    }

    #[test]
    fn attribute_value_decodes_named_character_reference() {
        let tokens = tokenize(r#"<a href="x&amp;y">"#);
        let tag = tokens
            .iter()
            .find_map(|t| match t {
                Token::TagToken(tag) => Some(tag),
                _ => None,
            })
            .unwrap();
        assert_eq!(tag.get_attribute("href").unwrap().as_ref(), "x&y");
    }

    #[test]
    fn comment_is_collected_verbatim() {
        let tokens = tokenize("<!-- hi -->");
        assert!(tokens.iter().any(|t| matches!(t, Token::CommentToken(c) if &**c == " hi ")));
    }
}
