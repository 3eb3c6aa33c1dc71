//! XML tree model for package parts
//!
//! Parts are parsed into an owned, namespace-resolved tree that can be
//! queried and edited in place and then serialized back.

mod namespace;
mod query;
mod tree;

pub use namespace::*;
pub use query::{query, XmlPath};
pub use tree::{NodePath, XmlAttribute, XmlDocument, XmlElement, XmlNode};
