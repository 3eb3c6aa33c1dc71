//! XML namespaces used in OOXML and prefix resolution

use crate::error::{Error, Result};
use crate::xml::XmlElement;

/// WordprocessingML main namespace
pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Relationships namespace
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// The `xml:` namespace, bound implicitly in every document
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace-qualified name with the prefix it is written under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    /// The name as written in markup, e.g. `w:pgMar`
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// Prefix to namespace-URI bindings used for queries and for naming new nodes.
///
/// Built from the declarations on a document's root element, with the
/// WordprocessingML (`w`) and relationship (`r`) namespaces registered up
/// front when the document does not bind them itself.
#[derive(Clone, Debug, Default)]
pub struct NamespaceMap {
    bindings: Vec<(String, String)>,
}

impl NamespaceMap {
    /// Empty map (only `xml:` resolves)
    pub fn new() -> Self {
        Self::default()
    }

    /// Map with the OOXML document namespaces registered
    pub fn wordprocessing() -> Self {
        let mut map = Self::new();
        map.register("w", W);
        map.register("r", R);
        map
    }

    /// Collect `xmlns:*` declarations from a root element, then fill in the
    /// document namespaces under their conventional prefixes if missing.
    pub fn from_root(root: &XmlElement) -> Self {
        let mut map = Self::new();
        for attr in &root.attributes {
            if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                map.register(prefix, &attr.value);
            }
        }
        for (prefix, uri) in [("w", W), ("r", R)] {
            if map.prefix_for(uri).is_none() && map.uri_for(prefix).is_none() {
                map.register(prefix, uri);
            }
        }
        map
    }

    /// Bind a prefix, replacing an earlier binding of the same prefix
    pub fn register(&mut self, prefix: &str, uri: &str) {
        match self.bindings.iter_mut().find(|(p, _)| p == prefix) {
            Some(binding) => binding.1 = uri.to_string(),
            None => self.bindings.push((prefix.to_string(), uri.to_string())),
        }
    }

    /// Namespace URI bound to a prefix
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, u)| u.as_str())
    }

    /// First prefix bound to a namespace URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        if uri == XML_NS {
            return Some("xml");
        }
        self.bindings
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Build a name in `uri` using whatever prefix the document binds it to
    pub fn name(&self, uri: &str, local: &str) -> Result<QualifiedName> {
        let prefix = self
            .prefix_for(uri)
            .ok_or_else(|| Error::InvalidDocument(format!("namespace {} is not bound", uri)))?;
        Ok(QualifiedName {
            namespace: Some(uri.to_string()),
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
        })
    }

    /// Resolve a `prefix:local` (or bare `local`) string
    pub fn resolve(&self, qualified: &str) -> Result<QualifiedName> {
        match qualified.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.uri_for(prefix).ok_or_else(|| {
                    Error::InvalidDocument(format!("unknown namespace prefix '{}'", prefix))
                })?;
                Ok(QualifiedName {
                    namespace: Some(uri.to_string()),
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                })
            }
            None => Ok(QualifiedName {
                namespace: None,
                prefix: None,
                local: qualified.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    #[test]
    fn test_from_root_reads_declarations() {
        let doc = XmlDocument::parse_str(
            r#"<x:document xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#,
        )
        .unwrap();
        let map = NamespaceMap::from_root(&doc.root);

        assert_eq!(map.prefix_for(W), Some("x"));
        assert_eq!(map.uri_for("r"), Some(R));
        assert_eq!(map.name(W, "body").unwrap().qualified(), "x:body");
    }

    #[test]
    fn test_resolve_unknown_prefix() {
        let map = NamespaceMap::wordprocessing();
        assert!(map.resolve("v:shape").is_err());
        assert_eq!(map.resolve("xml:space").unwrap().namespace.as_deref(), Some(XML_NS));
        assert_eq!(map.resolve("Target").unwrap().namespace, None);
    }
}
