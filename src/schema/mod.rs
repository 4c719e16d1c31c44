//! Schema synthesis: one XSD document per area or service namespace.
//!
//! Every data type becomes a complex type plus a `{Name}List` wrapper and two
//! nillable top-level elements. Optionally each operation stage gets a body
//! type restricting `malxml:Body`.

pub mod body;
pub mod document;
pub mod mapping;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaMappingError;
use crate::model::{
    Area, DataType, Field, MAL_AREA, Operation, Service, Specification, TypeReference,
};
use document::{
    AttributeDecl, ComplexType, Content, EnumType, Particle, QName, SchemaDocument, SchemaItem,
    TopElement,
};
use mapping::{
    ATTRIBUTE_TYPE, BODY_TYPE, COMPOSITE_TYPE, ELEMENT_TYPE, ENUM_SUFFIX, LIST_SUFFIX,
    XSD_NAMESPACE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Emit comments as `xs:documentation` annotations.
    pub include_docs: bool,
    /// Emit one body type per operation stage.
    pub include_body_types: bool,
    pub namespace_base: String,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            include_docs: true,
            include_body_types: false,
            namespace_base: mapping::DEFAULT_NAMESPACE_BASE.to_string(),
        }
    }
}

/// Documents keyed by file name (`{Area}{Service}.xsd`), in creation order.
pub type SchemaSet = IndexMap<String, SchemaDocument>;

pub fn synthesize(
    spec: &Specification,
    options: &SchemaOptions,
) -> Result<SchemaSet, SchemaMappingError> {
    let synth = Synthesizer {
        spec,
        options,
        mal_namespace: mapping::mal_namespace(&options.namespace_base),
    };
    let mut docs = SchemaSet::new();

    if spec.area(MAL_AREA).is_none() {
        synth.area(crate::model::builtin::mal_area(), &mut docs)?;
    }
    for area in spec.areas() {
        synth.area(area, &mut docs)?;
    }

    for doc in docs.values_mut() {
        doc.register(&synth.mal_namespace);
    }
    debug!(documents = docs.len(), "synthesized schema");
    Ok(docs)
}

/// A data type reference site, for error reporting.
struct Site<'a> {
    area: &'a str,
    service: Option<&'a str>,
    what: String,
}

impl Site<'_> {
    fn describe(&self) -> String {
        match self.service {
            Some(service) => format!("{} in {}.{}", self.what, self.area, service),
            None => format!("{} in {}", self.what, self.area),
        }
    }
}

struct Synthesizer<'a> {
    spec: &'a Specification,
    options: &'a SchemaOptions,
    mal_namespace: String,
}

impl Synthesizer<'_> {
    fn new_doc(&self, area: &str, service: Option<&str>) -> SchemaDocument {
        let namespace = mapping::namespace(&self.options.namespace_base, area, service);
        SchemaDocument::new(namespace, self.mal_namespace.clone())
    }

    fn comment(&self, comment: Option<&str>) -> Option<String> {
        if self.options.include_docs {
            comment.map(str::to_string)
        } else {
            None
        }
    }

    fn mal(&self, local: &str) -> QName {
        QName::new(self.mal_namespace.clone(), local)
    }

    /// QName of a referenced type; registers its namespace with `doc`.
    fn type_qname(
        &self,
        doc: &mut SchemaDocument,
        reference: &TypeReference,
        site: &Site<'_>,
    ) -> Result<QName, SchemaMappingError> {
        if self.spec.find_type(&reference.element()).is_none() {
            return Err(SchemaMappingError {
                reference: reference.to_string(),
                context: site.describe(),
            });
        }
        let namespace = mapping::namespace(
            &self.options.namespace_base,
            &reference.area,
            reference.service.as_deref(),
        );
        doc.register(&namespace);
        let mut local = reference.name.clone();
        if reference.list {
            local.push_str(LIST_SUFFIX);
        }
        Ok(QName::new(namespace, local))
    }

    fn area(&self, area: &Area, docs: &mut SchemaSet) -> Result<(), SchemaMappingError> {
        let is_mal = area.name == MAL_AREA;
        if is_mal || !area.data_types.is_empty() {
            debug!(area = %area.name, "synthesizing area schema");
            let mut doc = self.new_doc(&area.name, None);
            if is_mal {
                self.body_base(&mut doc);
            }
            for data_type in &area.data_types {
                self.data_type(&mut doc, &area.name, None, data_type)?;
            }
            docs.insert(mapping::file_name(&area.name, None), doc);
        }
        for service in &area.services {
            self.service(area, service, docs)?;
        }
        Ok(())
    }

    fn service(
        &self,
        area: &Area,
        service: &Service,
        docs: &mut SchemaSet,
    ) -> Result<(), SchemaMappingError> {
        let mut doc = None;
        if !service.data_types.is_empty() {
            debug!(area = %area.name, service = %service.name, "synthesizing service schema");
            let mut types = self.new_doc(&area.name, Some(&service.name));
            for data_type in &service.data_types {
                self.data_type(&mut types, &area.name, Some(&service.name), data_type)?;
            }
            doc = Some(types);
        }
        if self.options.include_body_types && service.operations().next().is_some() {
            let bodies = doc.get_or_insert_with(|| self.new_doc(&area.name, Some(&service.name)));
            for op in service.operations() {
                self.operation_bodies(bodies, &area.name, &service.name, op)?;
            }
        }
        if let Some(doc) = doc {
            docs.insert(mapping::file_name(&area.name, Some(&service.name)), doc);
        }
        Ok(())
    }

    /// `malxml:Body` and its element; only ever added to the MAL document.
    fn body_base(&self, doc: &mut SchemaDocument) {
        doc.items.push(SchemaItem::ComplexType(ComplexType {
            name: BODY_TYPE.to_string(),
            is_abstract: false,
            doc: None,
            content: Content::AnySequence,
        }));
        doc.items.push(SchemaItem::Element(TopElement {
            name: BODY_TYPE.to_string(),
            type_name: self.mal(BODY_TYPE),
            nillable: false,
        }));
    }

    fn data_type(
        &self,
        doc: &mut SchemaDocument,
        area: &str,
        service: Option<&str>,
        data_type: &DataType,
    ) -> Result<(), SchemaMappingError> {
        let namespace = doc.namespace.clone();
        let name = data_type.name().to_string();
        let type_doc = self.comment(data_type.comment());
        let mut extra = Vec::new();

        let complex = match data_type {
            DataType::Fundamental(t) => {
                let content = match &t.extends {
                    Some(parent) => {
                        let site = Site {
                            area,
                            service,
                            what: format!("parent of fundamental `{}`", t.name),
                        };
                        let base = self.type_qname(doc, parent, &site)?;
                        let mut attributes = Vec::new();
                        if area == MAL_AREA && t.name == COMPOSITE_TYPE {
                            attributes.push(AttributeDecl {
                                name: crate::model::types::DISCRIMINANT_NAME.to_string(),
                                type_name: QName::new(XSD_NAMESPACE, "long"),
                            });
                        }
                        Content::Extension {
                            base,
                            sequence: Vec::new(),
                            attributes,
                        }
                    }
                    None if area == MAL_AREA && t.name == ELEMENT_TYPE => Content::Empty,
                    None => Content::Extension {
                        base: self.mal(ELEMENT_TYPE),
                        sequence: Vec::new(),
                        attributes: Vec::new(),
                    },
                };
                ComplexType {
                    name: name.clone(),
                    is_abstract: true,
                    doc: type_doc,
                    content,
                }
            }
            DataType::Attribute(t) => ComplexType {
                name: name.clone(),
                is_abstract: false,
                doc: type_doc,
                content: Content::Extension {
                    base: self.mal(ATTRIBUTE_TYPE),
                    sequence: vec![Particle::Element {
                        name: t.name.clone(),
                        type_name: QName::new(XSD_NAMESPACE, mapping::primitive(&t.name)),
                        nillable: false,
                        repeated: false,
                        doc: None,
                    }],
                    attributes: Vec::new(),
                },
            },
            DataType::Enumeration(t) => {
                let enum_name = format!("{}{ENUM_SUFFIX}", t.name);
                extra.push(SchemaItem::EnumType(EnumType {
                    name: enum_name.clone(),
                    values: t
                        .items
                        .iter()
                        .map(|item| (item.value.clone(), self.comment(item.comment.as_deref())))
                        .collect(),
                }));
                ComplexType {
                    name: name.clone(),
                    is_abstract: false,
                    doc: type_doc,
                    content: Content::Extension {
                        base: self.mal(ELEMENT_TYPE),
                        sequence: vec![Particle::Element {
                            name: t.name.clone(),
                            type_name: QName::new(namespace.clone(), enum_name),
                            nillable: false,
                            repeated: false,
                            doc: None,
                        }],
                        attributes: Vec::new(),
                    },
                }
            }
            DataType::Composite(t) => {
                let base = match &t.extends {
                    Some(parent) => {
                        let site = Site {
                            area,
                            service,
                            what: format!("parent of composite `{}`", t.name),
                        };
                        self.type_qname(doc, parent, &site)?
                    }
                    None => self.mal(COMPOSITE_TYPE),
                };
                let mut sequence = Vec::with_capacity(t.fields.len());
                for field in &t.fields {
                    let site = Site {
                        area,
                        service,
                        what: format!("field `{}` of composite `{}`", field.name, t.name),
                    };
                    sequence.push(Particle::Element {
                        name: field.name.clone(),
                        type_name: self.type_qname(doc, &field.type_ref, &site)?,
                        nillable: field.nullable,
                        repeated: false,
                        doc: self.comment(field.comment.as_deref()),
                    });
                }
                ComplexType {
                    name: name.clone(),
                    is_abstract: t.is_abstract(),
                    doc: type_doc,
                    content: Content::Extension {
                        base,
                        sequence,
                        attributes: Vec::new(),
                    },
                }
            }
        };

        let is_abstract = complex.is_abstract;
        let list_name = format!("{name}{LIST_SUFFIX}");
        let composite = self.mal(COMPOSITE_TYPE);
        doc.register(&composite.namespace);
        doc.items.push(SchemaItem::ComplexType(complex));
        doc.items.extend(extra);
        doc.items.push(SchemaItem::ComplexType(ComplexType {
            name: list_name.clone(),
            is_abstract,
            doc: None,
            content: Content::Extension {
                base: composite,
                sequence: vec![Particle::Element {
                    name: name.clone(),
                    type_name: QName::new(namespace.clone(), name.clone()),
                    nillable: true,
                    repeated: true,
                    doc: None,
                }],
                attributes: Vec::new(),
            },
        }));
        for element in [name, list_name] {
            doc.items.push(SchemaItem::Element(TopElement {
                type_name: QName::new(namespace.clone(), element.clone()),
                name: element,
                nillable: true,
            }));
        }
        Ok(())
    }

    fn operation_bodies(
        &self,
        doc: &mut SchemaDocument,
        area: &str,
        service: &str,
        op: &Operation,
    ) -> Result<(), SchemaMappingError> {
        let base = self.mal(BODY_TYPE);
        doc.register(&base.namespace);
        for (stage, declared) in op.messages.stages() {
            let mut sequence = Vec::new();
            for field in body::body_fields(stage, &declared.fields) {
                sequence.push(self.body_ref(doc, area, service, op, &field)?);
            }
            let body = ComplexType {
                name: body::body_type_name(&op.name, stage),
                is_abstract: false,
                doc: self.comment(declared.comment.as_deref()),
                content: Content::Restriction {
                    base: base.clone(),
                    sequence,
                },
            };
            doc.items.push(SchemaItem::ComplexType(body));
        }
        Ok(())
    }

    fn body_ref(
        &self,
        doc: &mut SchemaDocument,
        area: &str,
        service: &str,
        op: &Operation,
        field: &Field,
    ) -> Result<Particle, SchemaMappingError> {
        let site = Site {
            area,
            service: Some(service),
            what: format!("field `{}` of operation `{}`", field.name, op.name),
        };
        Ok(Particle::Ref {
            target: self.type_qname(doc, &field.type_ref, &site)?,
            doc: self.comment(field.comment.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Composite;
    use crate::notation::{ParseOptions, parse_str};
    use indoc::indoc;

    fn synth(source: &str, options: &SchemaOptions) -> SchemaSet {
        let spec = parse_str(source, ParseOptions::default()).unwrap().spec;
        synthesize(&spec, options).unwrap()
    }

    #[test]
    fn test_mal_document_always_present_with_body() {
        let docs = synth("AREA A 1 1 { }", &SchemaOptions::default());
        assert_eq!(docs.keys().collect::<Vec<_>>(), vec!["MAL.xsd"]);
        let mal = &docs["MAL.xsd"];
        let body = mal.complex_type("Body").unwrap();
        assert_eq!(body.content, Content::AnySequence);
        assert!(mal.complex_type("BodyList").is_none());
        assert_eq!(mal.element("Body").map(|e| e.nillable), Some(false));
        assert!(mal.imports.is_empty());
    }

    #[test]
    fn test_mal_composite_carries_discriminant_attribute() {
        let docs = synth("AREA A 1 1 { }", &SchemaOptions::default());
        let composite = docs["MAL.xsd"].complex_type("Composite").unwrap();
        let Content::Extension { attributes, .. } = &composite.content else {
            panic!("expected extension");
        };
        assert_eq!(attributes[0].name, "type");
        assert!(composite.is_abstract);
        assert_eq!(docs["MAL.xsd"].complex_type("Element").unwrap().content, Content::Empty);
    }

    #[test]
    fn test_type_shapes() {
        let docs = synth(
            indoc! {r#"
                AREA A 1 1 {
                    ATTRIBUTE Odd 1
                    ENUM Mode 2 { ON "power" OFF }
                    COMPOSITE Base EXTENDS MAL.Composite { id: Long }
                    COMPOSITE Leaf 3 EXTENDS Base { note: String? "free text" }
                }
            "#},
            &SchemaOptions::default(),
        );
        let doc = &docs["A.xsd"];

        let odd = doc.complex_type("Odd").unwrap();
        assert_eq!(odd.base().map(|b| b.local.as_str()), Some("Attribute"));
        let Particle::Element { type_name, .. } = &odd.sequence()[0] else {
            panic!("expected element");
        };
        assert_eq!(type_name, &QName::new(XSD_NAMESPACE, "anyType"));

        let mode = doc.enum_type("ModeEnum").unwrap();
        assert_eq!(mode.values[0], ("ON".to_string(), Some("power".to_string())));
        assert_eq!(doc.complex_type("Mode").unwrap().base().map(|b| b.local.as_str()), Some("Element"));

        assert!(doc.complex_type("Base").unwrap().is_abstract);
        assert!(doc.complex_type("BaseList").unwrap().is_abstract);
        let leaf = doc.complex_type("Leaf").unwrap();
        assert!(!leaf.is_abstract);
        assert_eq!(leaf.base().map(|b| b.local.as_str()), Some("Base"));
        let Particle::Element { nillable, doc: note_doc, .. } = &leaf.sequence()[0] else {
            panic!("expected element");
        };
        assert!(*nillable);
        assert_eq!(note_doc.as_deref(), Some("free text"));

        for name in ["Odd", "Mode", "Base", "Leaf"] {
            let list = format!("{name}List");
            assert_eq!(doc.complex_types().filter(|t| t.name == list).count(), 1);
            assert!(doc.element(name).unwrap().nillable);
            assert!(doc.element(&list).unwrap().nillable);
        }
        assert_eq!(doc.imports.iter().collect::<Vec<_>>(), vec![&mapping::mal_namespace(mapping::DEFAULT_NAMESPACE_BASE)]);
    }

    #[test]
    fn test_docs_can_be_left_out() {
        let options = SchemaOptions {
            include_docs: false,
            ..SchemaOptions::default()
        };
        let docs = synth("/// Mode.\nAREA A 1 1 { /// Modes.\nENUM Mode 2 { ON \"power\" } }", &options);
        assert_eq!(docs["A.xsd"].complex_type("Mode").unwrap().doc, None);
        assert_eq!(docs["A.xsd"].enum_type("ModeEnum").unwrap().values[0].1, None);
    }

    #[test]
    fn test_service_namespace_imports_area() {
        let docs = synth(
            indoc! {"
                AREA A 1 1 {
                    COMPOSITE Shared 1 { }
                    SERVICE S 1 {
                        COMPOSITE Local 2 { shared: Shared }
                    }
                }
            "},
            &SchemaOptions::default(),
        );
        let keys: Vec<_> = docs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["MAL.xsd", "A.xsd", "AS.xsd"]);
        let service = &docs["AS.xsd"];
        assert_eq!(service.namespace, "http://www.ccsds.org/schema/malxml/A/S");
        assert!(service.imports.contains("http://www.ccsds.org/schema/malxml/A"));
        assert!(!service.imports.contains(&service.namespace));
    }

    #[test]
    fn test_pubsub_bodies() {
        let options = SchemaOptions {
            include_body_types: true,
            ..SchemaOptions::default()
        };
        let docs = synth(
            indoc! {"
                AREA A 1 1 { SERVICE S 1 { CAPABILITYSET 1 {
                    PUBSUB monitor 1 { publishNotify { f1: String f2: Integer[] } }
                } } }
            "},
            &options,
        );
        let doc = &docs["AS.xsd"];
        let names = |ty: &str| -> Vec<String> {
            doc.complex_type(ty)
                .unwrap()
                .sequence()
                .iter()
                .map(|p| p.name().to_string())
                .collect()
        };
        assert_eq!(
            names("monitor_PUBSUB_NOTIFY_Body"),
            vec!["Identifier", "UpdateHeaderList", "StringList", "IntegerList"]
        );
        assert_eq!(
            names("monitor_PUBSUB_PUBLISH_Body"),
            vec!["UpdateHeaderList", "StringList", "IntegerList"]
        );
        let body = doc.complex_type("monitor_PUBSUB_PUBLISH_Body").unwrap();
        assert_eq!(body.base().map(|b| b.local.as_str()), Some("Body"));
        assert!(docs["MAL.xsd"].complex_type("Body").is_some());
        assert!(doc.complex_type("Body").is_none());
    }

    #[test]
    fn test_unknown_reference_is_a_mapping_error() {
        let composite = Composite {
            name: "Broken".to_string(),
            comment: None,
            extends: None,
            short_form: Some(1),
            fields: vec![Field::new("x", TypeReference::new("Nowhere", "Thing"))],
        };
        let area = Area {
            name: "A".to_string(),
            number: 1,
            version: 1,
            comment: None,
            data_types: vec![DataType::Composite(composite)],
            errors: Vec::new(),
            services: Vec::new(),
        };
        let spec = Specification::new(None, vec![area]).unwrap();
        let err = synthesize(&spec, &SchemaOptions::default()).unwrap_err();
        assert_eq!(err.reference, "Nowhere.Thing");
        assert!(err.context.contains("field `x` of composite `Broken`"));
    }
}
