//! Programmer-facing failures, as distinct from recoverable HTML parse
//! errors (which are never `Result`-shaped — see `TreeSink::parse_error`
//! and `TokenSink::process_token` in `webparse-html`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("unknown fallback encoding label: {0:?}")]
    UnknownEncoding(String),
}
