//! The decode pipeline: byte stream -> Unicode scalar values.
//!
//! Grounded in `markup5ever::encoding` (which wraps `encoding_rs`). Adds the
//! BOM-sniffing front end that `spec.md` §4.1 asks for and that the
//! teacher's `InputStream` delegates to its caller (servo does BOM sniffing
//! in the HTML-meta-charset prescan, outside this crate's retrieved slice);
//! here it lives in `Decoder` itself so `webparse-core` is a complete decode
//! pipeline on its own.

use encoding_rs::{Decoder as RsDecoder, Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};
use tendril::StrTendril;

use crate::buffer_queue::BufferQueue;
use crate::error::ParserError;

/// <https://html.spec.whatwg.org/multipage/parsing.html#concept-encoding-confidence>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confidence {
    Tentative,
    Certain,
    Irrelevant,
}

/// Resolves an encoding label (e.g. from a `charset` HTTP header or a
/// `<meta charset>`) to a `&'static Encoding`. This is the one place the
/// "raw encoding-label lookup table" spec.md calls an external collaborator
/// would plug in; `encoding_rs::Encoding::for_label` already implements the
/// WHATWG label table, so it is used directly rather than hand duplicated.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

enum BomState {
    /// Still buffering the first <= 3 bytes, deciding whether they are a BOM.
    Sniffing(Vec<u8>),
    Decided,
}

/// Decodes a byte stream to Unicode scalar values, sniffing a leading BOM
/// before falling back to a caller-supplied encoding.
pub struct Decoder {
    inner: RsDecoder,
    confidence: Confidence,
    bom: BomState,
    fallback: &'static Encoding,
}

impl Decoder {
    pub fn new(fallback: &'static Encoding) -> Self {
        Decoder {
            inner: fallback.new_decoder(),
            confidence: Confidence::Tentative,
            bom: BomState::Sniffing(Vec::with_capacity(3)),
            fallback,
        }
    }

    pub fn with_label(fallback_label: &str) -> Result<Self, ParserError> {
        let fallback = encoding_for_label(fallback_label)
            .ok_or_else(|| ParserError::UnknownEncoding(fallback_label.to_string()))?;
        Ok(Decoder::new(fallback))
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.inner.encoding()
    }

    /// <https://encoding.spec.whatwg.org/#concept-encoding-get> as applied by
    /// the navigate-with-replace algorithm: a `<meta charset>` or similar
    /// in-document signal asks to switch encodings. Returns the encoding to
    /// actually restart with, if a restart is warranted.
    pub fn change_the_encoding_to(&mut self, mut new_encoding: &'static Encoding) -> Option<&'static Encoding> {
        let current = self.inner.encoding();
        if current == UTF_16BE || current == UTF_16LE {
            self.confidence = Confidence::Certain;
            return None;
        }
        if new_encoding == UTF_16BE || new_encoding == UTF_16LE {
            new_encoding = UTF_8;
        }
        if new_encoding == X_USER_DEFINED {
            new_encoding = WINDOWS_1252;
        }
        if current == new_encoding {
            self.confidence = Confidence::Certain;
            return None;
        }
        Some(new_encoding)
    }

    /// Feeds `chunk` through the BOM sniffer (if still sniffing) and then
    /// the encoding_rs decoder, pushing decoded text onto `output`. On a
    /// malformed sequence, emits U+FFFD (the Replacement error policy) and
    /// continues — decoders never fail outright.
    pub fn decode(&mut self, chunk: &[u8], last: bool, output: &BufferQueue) {
        let mut remaining = chunk;
        if let BomState::Sniffing(buf) = &mut self.bom {
            let need = 3 - buf.len();
            let take = need.min(remaining.len());
            buf.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            if buf.len() == 3 || (last && remaining.is_empty() && !buf.is_empty() && buf.len() < 3) {
                let sniffed = sniff_bom(buf);
                let buffered = std::mem::take(buf);
                self.bom = BomState::Decided;
                match sniffed {
                    Some((encoding, bom_len)) => {
                        self.inner = encoding.new_decoder();
                        self.confidence = Confidence::Certain;
                        self.decode_inner(&buffered[bom_len..], false, output);
                    }
                    None => {
                        self.inner = self.fallback.new_decoder();
                        self.decode_inner(&buffered, false, output);
                    }
                }
            } else if !last {
                return;
            } else {
                // EOF with fewer than 3 bytes ever seen and nothing queued
                // now: flush whatever was buffered through the fallback.
                let buffered = std::mem::take(buf);
                self.bom = BomState::Decided;
                self.inner = self.fallback.new_decoder();
                self.decode_inner(&buffered, false, output);
            }
        }
        self.decode_inner(remaining, last, output);
    }

    fn decode_inner(&mut self, mut remaining: &[u8], last: bool, output: &BufferQueue) {
        loop {
            let mut out: tendril::Tendril<tendril::fmt::Bytes> = tendril::Tendril::new();
            let max_len = self
                .inner
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(8192)
                .min(8192);

            // SAFETY: `decode_to_utf8_without_replacement` only ever writes
            // valid UTF-8 into the prefix of `out` it reports back via
            // `bytes_written`; we only read that prefix below.
            unsafe {
                out.push_uninitialized(max_len as u32);
            }

            let (result, bytes_read, bytes_written) =
                self.inner.decode_to_utf8_without_replacement(remaining, &mut out, last);

            if bytes_written > 0 {
                let chunk = out.subtendril(0, bytes_written as u32);
                // SAFETY: see above — this range is the decoder's reported
                // valid-UTF-8 output.
                let chunk: StrTendril = unsafe { chunk.reinterpret_without_validating() };
                output.push_back(chunk);
            }

            if matches!(result, encoding_rs::DecoderResult::Malformed(_, _)) {
                output.push_back(StrTendril::from("\u{FFFD}"));
            }

            remaining = &remaining[bytes_read..];
            if remaining.is_empty() {
                return;
            }
        }
    }
}

fn sniff_bom(buf: &[u8]) -> Option<(&'static Encoding, usize)> {
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some((UTF_8, 3))
    } else if buf.starts_with(&[0xFE, 0xFF]) {
        Some((UTF_16BE, 2))
    } else if buf.starts_with(&[0xFF, 0xFE]) {
        Some((UTF_16LE, 2))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> String {
        let bq = BufferQueue::new();
        let mut decoder = Decoder::new(UTF_8);
        decoder.decode(bytes, true, &bq);
        let mut out = String::new();
        while let Some(chunk) = bq.pop_front() {
            out.push_str(&chunk);
        }
        out
    }

    #[test]
    fn utf8_bom_is_consumed_silently() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("あ".as_bytes());
        assert_eq!(decode_all(&bytes), "あ");
    }

    #[test]
    fn no_bom_falls_back() {
        assert_eq!(decode_all("hello".as_bytes()), "hello");
    }

    #[test]
    fn utf16le_bom_switches_decoder() {
        let mut bytes = vec![0xFF, 0xFE];
        for u in "hi".encode_utf16() {
            bytes.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(decode_all(&bytes), "hi");
    }

    #[test]
    fn malformed_byte_becomes_replacement_character() {
        let out = decode_all(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }
}
