//! Namespace-qualified path queries over [`XmlElement`] trees
//!
//! Supported syntax is deliberately small: `a/b` selects child elements step
//! by step, `//` (or a leading `.//`) switches the next step to the
//! descendant axis. Names are `prefix:local` resolved through a
//! [`NamespaceMap`], so matching is by namespace URI, never by prefix.

use crate::error::Result;
use crate::xml::{NamespaceMap, NodePath, QualifiedName, XmlElement};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Clone, Debug)]
struct Step {
    axis: Axis,
    name: QualifiedName,
}

/// A compiled path
#[derive(Clone, Debug)]
pub struct XmlPath {
    steps: Vec<Step>,
}

impl XmlPath {
    /// Compile `path`, resolving prefixes through `namespaces`
    pub fn parse(path: &str, namespaces: &NamespaceMap) -> Result<Self> {
        let mut steps = Vec::new();
        let mut descendant = false;

        for segment in path.split('/') {
            match segment {
                "" => descendant = true,
                "." => {}
                name => {
                    steps.push(Step {
                        axis: if descendant { Axis::Descendant } else { Axis::Child },
                        name: namespaces.resolve(name)?,
                    });
                    descendant = false;
                }
            }
        }

        Ok(Self { steps })
    }

    /// Paths of all matches below `context`, in document order
    pub fn select(&self, context: &XmlElement) -> Vec<NodePath> {
        let mut current = vec![NodePath::root()];

        for step in &self.steps {
            let mut next = Vec::new();
            for path in &current {
                let Some(element) = context.at(path) else {
                    continue;
                };
                match step.axis {
                    Axis::Child => {
                        for (index, child) in element.indexed_elements() {
                            if child.matches(&step.name) {
                                push_unique(&mut next, path.child(index));
                            }
                        }
                    }
                    Axis::Descendant => collect_descendants(element, path, &step.name, &mut next),
                }
            }
            current = next;
        }

        current
    }

    /// First match below `context`
    pub fn select_first(&self, context: &XmlElement) -> Option<NodePath> {
        self.select(context).into_iter().next()
    }
}

/// Elements matching `path` below `context`. No match is an empty vector.
pub fn query<'a>(
    context: &'a XmlElement,
    path: &str,
    namespaces: &NamespaceMap,
) -> Result<Vec<&'a XmlElement>> {
    let compiled = XmlPath::parse(path, namespaces)?;
    Ok(compiled
        .select(context)
        .iter()
        .filter_map(|p| context.at(p))
        .collect())
}

fn collect_descendants(
    element: &XmlElement,
    path: &NodePath,
    name: &QualifiedName,
    out: &mut Vec<NodePath>,
) {
    for (index, child) in element.indexed_elements() {
        let child_path = path.child(index);
        if child.matches(name) {
            push_unique(out, child_path.clone());
        }
        collect_descendants(child, &child_path, name, out);
    }
}

fn push_unique(paths: &mut Vec<NodePath>, path: NodePath) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}
