//! XSD text output for synthesized schema documents.

use crate::schema::document::{
    ComplexType, Content, EnumType, Particle, QName, SchemaDocument, SchemaItem, TopElement,
};
use crate::schema::mapping::XSD_NAMESPACE;

const INDENT: &str = "  ";

/// Escape text for use inside an XML attribute value or text node.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal indenting XML writer.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn start(&mut self, tag: &str, attrs: &[(&str, String)]) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, String)]) {
        self.start(tag, attrs);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, String)]) {
        self.start(tag, attrs);
        self.out.push_str("/>\n");
    }

    fn text(&mut self, tag: &str, text: &str) {
        self.start(tag, &[]);
        self.out.push_str(&format!(">{}</{tag}>\n", escape(text)));
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&format!("</{tag}>\n"));
    }
}

/// Maps namespaces to the prefixes declared on the schema element.
struct Prefixes<'a> {
    doc: &'a SchemaDocument,
    mal: &'a str,
}

impl Prefixes<'_> {
    fn prefix(&self, namespace: &str) -> String {
        if namespace == XSD_NAMESPACE {
            return "xs".to_string();
        }
        if namespace == self.mal {
            return "malxml".to_string();
        }
        if namespace == self.doc.namespace {
            return "tns".to_string();
        }
        let position = self
            .others()
            .position(|ns| ns == namespace)
            .map_or(0, |idx| idx + 1);
        format!("ns{position}")
    }

    fn others(&self) -> impl Iterator<Item = &str> {
        self.doc
            .imports
            .iter()
            .map(String::as_str)
            .filter(move |ns| *ns != self.mal && *ns != self.doc.namespace)
    }

    fn qname(&self, name: &QName) -> String {
        format!("{}:{}", self.prefix(&name.namespace), name.local)
    }
}

pub fn render(doc: &SchemaDocument) -> String {
    let mal_namespace = doc.mal_namespace.as_str();
    let prefixes = Prefixes {
        doc,
        mal: mal_namespace,
    };
    let mut w = XmlWriter::new();

    let mut attrs = vec![
        ("xmlns:xs", XSD_NAMESPACE.to_string()),
        ("xmlns:malxml", mal_namespace.to_string()),
        ("xmlns:tns", doc.namespace.clone()),
    ];
    let others: Vec<(String, String)> = prefixes
        .others()
        .enumerate()
        .map(|(idx, ns)| (format!("xmlns:ns{}", idx + 1), ns.to_string()))
        .collect();
    for (name, ns) in &others {
        attrs.push((name.as_str(), ns.clone()));
    }
    attrs.push(("targetNamespace", doc.namespace.clone()));
    attrs.push(("elementFormDefault", "qualified".to_string()));
    attrs.push(("attributeFormDefault", "qualified".to_string()));
    w.open("xs:schema", &attrs);

    for ns in &doc.imports {
        w.empty("xs:import", &[("namespace", ns.clone())]);
    }
    for item in &doc.items {
        match item {
            SchemaItem::ComplexType(t) => complex_type(&mut w, &prefixes, t),
            SchemaItem::EnumType(t) => enum_type(&mut w, t),
            SchemaItem::Element(e) => top_element(&mut w, &prefixes, e),
        }
    }
    w.close("xs:schema");
    w.out
}

fn annotation(w: &mut XmlWriter, doc: Option<&str>) {
    if let Some(text) = doc {
        w.open("xs:annotation", &[]);
        w.text("xs:documentation", text);
        w.close("xs:annotation");
    }
}

fn complex_type(w: &mut XmlWriter, p: &Prefixes<'_>, t: &ComplexType) {
    let mut attrs = vec![("name", t.name.clone())];
    if t.is_abstract {
        attrs.push(("abstract", "true".to_string()));
    }
    if t.doc.is_none() && matches!(t.content, Content::Empty) {
        w.empty("xs:complexType", &attrs);
        return;
    }
    w.open("xs:complexType", &attrs);
    annotation(w, t.doc.as_deref());
    match &t.content {
        Content::Empty => {}
        Content::Extension {
            base,
            sequence,
            attributes,
        } => {
            w.open("xs:complexContent", &[]);
            w.open("xs:extension", &[("base", p.qname(base))]);
            particles(w, p, sequence);
            for attr in attributes {
                w.empty(
                    "xs:attribute",
                    &[("name", attr.name.clone()), ("type", p.qname(&attr.type_name))],
                );
            }
            w.close("xs:extension");
            w.close("xs:complexContent");
        }
        Content::Restriction { base, sequence } => {
            w.open("xs:complexContent", &[]);
            w.open("xs:restriction", &[("base", p.qname(base))]);
            particles(w, p, sequence);
            w.close("xs:restriction");
            w.close("xs:complexContent");
        }
        Content::AnySequence => {
            w.open("xs:sequence", &[]);
            w.empty(
                "xs:any",
                &[
                    ("processContents", "lax".to_string()),
                    ("minOccurs", "0".to_string()),
                    ("maxOccurs", "unbounded".to_string()),
                ],
            );
            w.close("xs:sequence");
        }
    }
    w.close("xs:complexType");
}

fn particles(w: &mut XmlWriter, p: &Prefixes<'_>, sequence: &[Particle]) {
    if sequence.is_empty() {
        w.empty("xs:sequence", &[]);
        return;
    }
    w.open("xs:sequence", &[]);
    for particle in sequence {
        let (attrs, doc) = match particle {
            Particle::Element {
                name,
                type_name,
                nillable,
                repeated,
                doc,
            } => {
                let mut attrs = vec![("name", name.clone()), ("type", p.qname(type_name))];
                if *repeated {
                    attrs.push(("minOccurs", "0".to_string()));
                    attrs.push(("maxOccurs", "unbounded".to_string()));
                }
                if *nillable {
                    attrs.push(("nillable", "true".to_string()));
                }
                (attrs, doc)
            }
            Particle::Ref { target, doc } => (vec![("ref", p.qname(target))], doc),
        };
        match doc {
            Some(text) => {
                w.open("xs:element", &attrs);
                annotation(w, Some(text));
                w.close("xs:element");
            }
            None => w.empty("xs:element", &attrs),
        }
    }
    w.close("xs:sequence");
}

fn enum_type(w: &mut XmlWriter, t: &EnumType) {
    w.open("xs:simpleType", &[("name", t.name.clone())]);
    w.open("xs:restriction", &[("base", "xs:string".to_string())]);
    for (value, doc) in &t.values {
        match doc {
            Some(text) => {
                w.open("xs:enumeration", &[("value", value.clone())]);
                annotation(w, Some(text));
                w.close("xs:enumeration");
            }
            None => w.empty("xs:enumeration", &[("value", value.clone())]),
        }
    }
    w.close("xs:restriction");
    w.close("xs:simpleType");
}

fn top_element(w: &mut XmlWriter, p: &Prefixes<'_>, e: &TopElement) {
    let mut attrs = vec![("name", e.name.clone()), ("type", p.qname(&e.type_name))];
    if e.nillable {
        attrs.push(("nillable", "true".to_string()));
    }
    w.empty("xs:element", &attrs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b & "c">"#), "a&lt;b &amp; &quot;c&quot;&gt;");
    }

    #[test]
    fn test_prefixes_for_imports() {
        let mut doc = SchemaDocument::new("urn:x/A", "urn:x/MAL");
        doc.imports.insert("urn:x/B".to_string());
        doc.imports.insert("urn:x/MAL".to_string());
        doc.items.push(SchemaItem::Element(TopElement {
            name: "Thing".to_string(),
            type_name: QName::new("urn:x/B", "Thing"),
            nillable: true,
        }));
        let xml = render(&doc);
        assert!(xml.contains(r#"xmlns:ns1="urn:x/B""#));
        assert!(xml.contains(r#"<xs:import namespace="urn:x/B"/>"#));
        assert!(xml.contains(r#"<xs:element name="Thing" type="ns1:Thing" nillable="true"/>"#));
        assert!(xml.ends_with("</xs:schema>\n"));
    }
}
