//! jdoc-core: document tree, streaming reader, and text codec
//!
//! This crate focuses on a small, well-factored surface:
//! - Document arena with typed nodes and dotted-path get/set/remove
//! - Streaming reader over strings, byte streams, or files (non-recursive,
//!   bounded only by memory, with an optional relaxed bare-value grammar)
//! - Compact and pretty serializers that round-trip through the reader
//! - String escape/unescape codec with a shared `\uXXXX` scanner
//!
pub mod doc;
pub mod escape;
pub mod reader;
pub mod writer;

pub use doc::{DocError, Document, Kind, NodeId, Scalar};
pub use escape::{decode_escapes, escape, unescape};
pub use reader::{Charset, ReadError, ReadOpts, parse_file, parse_str, parse_stream};
pub use writer::{dump, dump_pretty};
