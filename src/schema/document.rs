//! In-memory schema documents, one per target namespace.

use indexmap::IndexSet;

use crate::render::xsd;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub type_name: QName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Particle {
    /// Local element declaration.
    Element {
        name: String,
        type_name: QName,
        nillable: bool,
        /// `minOccurs="0" maxOccurs="unbounded"`.
        repeated: bool,
        doc: Option<String>,
    },
    /// Reference to a top-level element.
    Ref { target: QName, doc: Option<String> },
}

impl Particle {
    /// Local element name, or the referenced element's name.
    pub fn name(&self) -> &str {
        match self {
            Particle::Element { name, .. } => name,
            Particle::Ref { target, .. } => &target.local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Empty,
    Extension {
        base: QName,
        sequence: Vec<Particle>,
        attributes: Vec<AttributeDecl>,
    },
    Restriction {
        base: QName,
        sequence: Vec<Particle>,
    },
    /// Open sequence of lax `xs:any`.
    AnySequence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexType {
    pub name: String,
    pub is_abstract: bool,
    pub doc: Option<String>,
    pub content: Content,
}

impl ComplexType {
    pub fn base(&self) -> Option<&QName> {
        match &self.content {
            Content::Extension { base, .. } | Content::Restriction { base, .. } => Some(base),
            Content::Empty | Content::AnySequence => None,
        }
    }

    pub fn sequence(&self) -> &[Particle] {
        match &self.content {
            Content::Extension { sequence, .. } | Content::Restriction { sequence, .. } => sequence,
            Content::Empty | Content::AnySequence => &[],
        }
    }
}

/// String restriction listing enumeration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopElement {
    pub name: String,
    pub type_name: QName,
    pub nillable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaItem {
    ComplexType(ComplexType),
    EnumType(EnumType),
    Element(TopElement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument {
    pub namespace: String,
    /// Namespace of the MAL area, bound to the `malxml` prefix.
    pub mal_namespace: String,
    /// Namespaces to import, in registration order. Never holds `namespace`.
    pub imports: IndexSet<String>,
    pub items: Vec<SchemaItem>,
}

impl SchemaDocument {
    pub fn new(namespace: impl Into<String>, mal_namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            mal_namespace: mal_namespace.into(),
            imports: IndexSet::new(),
            items: Vec::new(),
        }
    }

    /// Record that this document references `namespace`.
    pub fn register(&mut self, namespace: &str) {
        if namespace != self.namespace {
            self.imports.insert(namespace.to_string());
        }
    }

    pub fn complex_types(&self) -> impl Iterator<Item = &ComplexType> {
        self.items.iter().filter_map(|item| match item {
            SchemaItem::ComplexType(t) => Some(t),
            _ => None,
        })
    }

    pub fn complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types().find(|t| t.name == name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.items.iter().find_map(|item| match item {
            SchemaItem::EnumType(t) if t.name == name => Some(t),
            _ => None,
        })
    }

    pub fn elements(&self) -> impl Iterator<Item = &TopElement> {
        self.items.iter().filter_map(|item| match item {
            SchemaItem::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn element(&self, name: &str) -> Option<&TopElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn to_xml(&self) -> String {
        xsd::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_imports_itself() {
        let mut doc = SchemaDocument::new("urn:a", "urn:mal");
        doc.register("urn:a");
        doc.register("urn:b");
        doc.register("urn:b");
        assert_eq!(doc.imports.iter().collect::<Vec<_>>(), vec!["urn:b"]);
    }
}
