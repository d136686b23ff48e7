//! WHATWG HTML tokenizer, tree constructor, and parsing driver.
//!
//! Grounded in `html5ever`'s crate root (`tokenizer`/`tree_builder`/
//! `driver` modules, `interface` re-exports).

pub mod driver;
pub mod interface;
pub mod tokenizer;
pub mod tree_builder;

pub use driver::{ParseOpts, Parser, ParserAction, PendingInput};
pub use interface::{ElementFlags, NextParserState, NodeOrText, QuirksMode, TreeSink};
pub use tree_builder::{TreeBuilder, TreeBuilderOpts};
