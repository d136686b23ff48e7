//! The character-reference sub-tokenizer, invoked from the `Data`,
//! `RawData(Rcdata)`, and attribute-value states whenever a `&` is seen.
//!
//! Grounded in `html5ever::tokenizer::char_ref`, rewritten against
//! `webparse_core::entities::Matcher` in place of the teacher's direct
//! `data::NAMED_ENTITIES` phf lookups, per `spec.md`'s "tokenizer submits
//! code points to a matcher object; receives a status" redesign note.

use std::borrow::Cow::Borrowed;

use log::debug;
use tendril::StrTendril;
use webparse_core::entities::{self, Matcher, Status as MatchStatus};

use super::{TokenSink, Tokenizer};
use webparse_core::buffer_queue::BufferQueue;

/// Windows-1252 maps C1 control codepoints U+0080..U+009F to these
/// characters; `&#x80;`-style numeric references in that range are
/// historically remapped the same way.
/// <https://html.spec.whatwg.org/multipage/parsing.html#numeric-character-reference-end-state>
const C1_REPLACEMENTS: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

pub(super) struct CharRef {
    pub(super) chars: [char; 2],
    pub(super) num_chars: u8,
}

impl CharRef {
    const EMPTY: CharRef = CharRef { chars: ['\0', '\0'], num_chars: 0 };

    fn one(c: char) -> CharRef {
        CharRef { chars: [c, '\0'], num_chars: 1 }
    }
}

pub(super) enum Status {
    Stuck,
    Progress,
    Done(CharRef),
}

#[derive(Debug)]
enum State {
    Begin,
    Octothorpe,
    Numeric(u32),
    NumericSemicolon,
    Named,
}

pub(super) struct CharRefTokenizer {
    state: State,
    is_consumed_in_attribute: bool,

    num: u32,
    num_too_big: bool,
    seen_digit: bool,
    hex_marker: Option<char>,

    matcher: Matcher,
    raw: String,
}

impl CharRefTokenizer {
    pub(super) fn new(is_consumed_in_attribute: bool) -> CharRefTokenizer {
        CharRefTokenizer {
            is_consumed_in_attribute,
            state: State::Begin,
            num: 0,
            num_too_big: false,
            seen_digit: false,
            hex_marker: None,
            matcher: Matcher::new(),
            raw: String::new(),
        }
    }

    pub(super) fn step<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Status {
        debug!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            State::Begin => self.do_begin(tokenizer, input),
            State::Octothorpe => self.do_octothorpe(tokenizer, input),
            State::Numeric(base) => self.do_numeric(tokenizer, input, base),
            State::NumericSemicolon => self.do_numeric_semicolon(tokenizer, input),
            State::Named => self.do_named(tokenizer, input),
        }
    }

    fn do_begin<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>, input: &BufferQueue) -> Status {
        match tokenizer.peek(input) {
            Some(c) if c.is_ascii_alphanumeric() => {
                self.state = State::Named;
                Status::Progress
            }
            Some('#') => {
                tokenizer.discard_char(input);
                self.state = State::Octothorpe;
                Status::Progress
            }
            Some(_) => Status::Done(CharRef::EMPTY),
            None => Status::Stuck,
        }
    }

    fn do_octothorpe<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>, input: &BufferQueue) -> Status {
        match tokenizer.peek(input) {
            Some(c @ ('x' | 'X')) => {
                tokenizer.discard_char(input);
                self.hex_marker = Some(c);
                self.state = State::Numeric(16);
            }
            Some(_) => {
                self.hex_marker = None;
                self.state = State::Numeric(10);
            }
            None => return Status::Stuck,
        }
        Status::Progress
    }

    fn do_numeric<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
        base: u32,
    ) -> Status {
        let Some(c) = tokenizer.peek(input) else {
            return Status::Stuck;
        };
        match c.to_digit(base) {
            Some(n) => {
                tokenizer.discard_char(input);
                self.num = self.num.wrapping_mul(base);
                if self.num > 0x10FFFF {
                    self.num_too_big = true;
                }
                self.num = self.num.wrapping_add(n);
                self.seen_digit = true;
                Status::Progress
            }
            None if !self.seen_digit => self.unconsume_numeric(tokenizer, input),
            None => {
                self.state = State::NumericSemicolon;
                Status::Progress
            }
        }
    }

    fn do_numeric_semicolon<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Status {
        match tokenizer.peek(input) {
            Some(';') => tokenizer.discard_char(input),
            Some(_) => tokenizer.emit_error(Borrowed("Semicolon missing after numeric character reference")),
            None => return Status::Stuck,
        };
        self.finish_numeric(tokenizer)
    }

    fn unconsume_numeric<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Status {
        let mut unconsume = StrTendril::from_char('#');
        if let Some(c) = self.hex_marker {
            unconsume.push_char(c);
        }
        input.push_front(unconsume);
        tokenizer.emit_error(Borrowed("Numeric character reference without digits"));
        Status::Done(CharRef::EMPTY)
    }

    fn finish_numeric<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> Status {
        fn conv(n: u32) -> char {
            char::from_u32(n).expect("invalid char missed by error handling cases")
        }

        let (c, error) = match self.num {
            n if (n > 0x10FFFF) || self.num_too_big => ('\u{FFFD}', true),
            0x00 | 0xD800..=0xDFFF => ('\u{FFFD}', true),
            0x80..=0x9F => match C1_REPLACEMENTS[(self.num - 0x80) as usize] {
                Some(c) => (c, true),
                None => (conv(self.num), true),
            },
            0x01..=0x08 | 0x0B | 0x0D..=0x1F | 0x7F | 0xFDD0..=0xFDEF => (conv(self.num), true),
            n if (n & 0xFFFE) == 0xFFFE => (conv(n), true),
            n => (conv(n), false),
        };

        if error {
            let msg = if tokenizer.opts.exact_errors {
                std::borrow::Cow::from(format!("Invalid numeric character reference value 0x{:06X}", self.num))
            } else {
                std::borrow::Cow::from("Invalid numeric character reference")
            };
            tokenizer.emit_error(msg);
        }

        Status::Done(CharRef::one(c))
    }

    fn do_named<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>, input: &BufferQueue) -> Status {
        let Some(c) = tokenizer.peek(input) else {
            return Status::Stuck;
        };
        if !c.is_ascii_alphanumeric() && c != ';' {
            return self.finish_named(tokenizer, input, None);
        }
        tokenizer.discard_char(input);
        self.raw.push(c);
        match self.matcher.feed(c) {
            MatchStatus::Incomplete | MatchStatus::Matched(_) => Status::Progress,
            MatchStatus::Dead => self.finish_named(tokenizer, input, Some(c)),
        }
    }

    fn emit_name_error<Sink: TokenSink>(&self, tokenizer: &Tokenizer<Sink>) {
        let msg = if tokenizer.opts.exact_errors {
            std::borrow::Cow::from(format!("Invalid character reference &{}", self.raw))
        } else {
            std::borrow::Cow::from("Invalid character reference")
        };
        tokenizer.emit_error(msg);
    }

    fn unconsume_name(&mut self, input: &BufferQueue) {
        input.push_front(StrTendril::from_slice(&self.raw));
    }

    fn finish_named<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
        end_char: Option<char>,
    ) -> Status {
        let matched_len = self.matcher.matched_so_far().len();
        if matched_len == 0 {
            if let Some(c) = end_char {
                if c == ';' {
                    self.emit_name_error(tokenizer);
                }
            }
            self.unconsume_name(input);
            return Status::Done(CharRef::EMPTY);
        }

        let char_ref = match entities::lookup_exact(&self.raw[..matched_len]) {
            Some(r) => r,
            None => {
                self.unconsume_name(input);
                return Status::Done(CharRef::EMPTY);
            }
        };

        let last_matched = self.raw[..matched_len].chars().last().unwrap();
        let leftover = &self.raw[matched_len..];
        let next_after = leftover.chars().next();

        let unconsume_all = match (self.is_consumed_in_attribute, last_matched, next_after) {
            (_, ';', _) => false,
            (true, _, Some('=')) => true,
            (true, _, Some(c)) if c.is_ascii_alphanumeric() => true,
            _ => {
                tokenizer.emit_error(Borrowed("Character reference does not end with semicolon"));
                false
            }
        };

        if unconsume_all {
            self.unconsume_name(input);
            Status::Done(CharRef::EMPTY)
        } else {
            if !leftover.is_empty() {
                input.push_front(StrTendril::from_slice(leftover));
            }
            let mut chars = char_ref.chars();
            let first = chars.next().unwrap();
            match chars.next() {
                Some(second) => Status::Done(CharRef { chars: [first, second], num_chars: 2 }),
                None => Status::Done(CharRef::one(first)),
            }
        }
    }

    pub(super) fn end_of_file<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> CharRef {
        loop {
            let status = match self.state {
                State::Begin => Status::Done(CharRef::EMPTY),
                State::Numeric(_) if !self.seen_digit => self.unconsume_numeric(tokenizer, input),
                State::Numeric(_) | State::NumericSemicolon => {
                    tokenizer.emit_error(Borrowed("EOF in numeric character reference"));
                    self.finish_numeric(tokenizer)
                }
                State::Named => self.finish_named(tokenizer, input, None),
                State::Octothorpe => {
                    input.push_front(StrTendril::from_slice("#"));
                    tokenizer.emit_error(Borrowed("EOF after '#' in character reference"));
                    Status::Done(CharRef::EMPTY)
                }
            };

            match status {
                Status::Done(char_ref) => return char_ref,
                Status::Stuck => return CharRef::EMPTY,
                Status::Progress => {}
            }
        }
    }
}
