//! Stream acquisition: reconnectable byte sources and paced fixed-size
//! readers.

pub mod source;
pub mod stream;

pub use source::{ByteSource, FileSource};
pub use stream::StreamReader;
