//! An arena-backed DOM, a [`webparse_html::interface::TreeSink`]
//! implementation over it, and an HTML serializer: `spec.md` §3, §4.8, §9.

pub mod arena;
pub mod serializer;
pub mod sink;

pub use arena::{Arena, NodeData, NodeId, QuirksMode};
pub use serializer::{serialize_to_string, HtmlSerializer, SerializableNode};
pub use sink::Dom;
