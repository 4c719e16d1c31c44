//! Serializable view of the model in the canonical document layout.
//!
//! Encoding builds these structs from a borrowed model and never touches the
//! model itself. The `errors` collections of areas, services and operations
//! are left out when empty; every other collection is always written.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::model::{
    Area, Attribute, CapabilitySet, Composite, DataType, EnumItem, Enumeration, ErrorDefinition,
    ErrorReference, Field, Fundamental, InteractionPattern, Messages, Operation, Service,
    Specification, Stage, TypeReference,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub areas: Vec<AreaDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDoc {
    pub name: String,
    pub number: u32,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub data_types: Vec<DataTypeDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDefDoc>,
    #[serde(default)]
    pub services: Vec<ServiceDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDoc {
    pub name: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub data_types: Vec<DataTypeDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDefDoc>,
    #[serde(default)]
    pub capability_sets: Vec<CapabilitySetDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySetDoc {
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub operations: Vec<OperationDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDoc {
    pub pattern: String,
    pub name: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub supports_replay: bool,
    /// Stage blocks keyed by their notation names, in pattern order.
    #[serde(default)]
    pub messages: IndexMap<String, StageDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRefDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRefDoc {
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub name: String,
    #[serde(default)]
    pub list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRefDoc,
    #[serde(default)]
    pub can_be_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDoc {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvalue: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DataTypeDoc {
    Fundamental {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<TypeRefDoc>,
    },
    Attribute {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        short_form_part: Option<u32>,
    },
    Enumeration {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        short_form_part: Option<u32>,
        #[serde(default)]
        items: Vec<ItemDoc>,
    },
    Composite {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<TypeRefDoc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        short_form_part: Option<u32>,
        #[serde(default)]
        fields: Vec<FieldDoc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDefDoc {
    pub name: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_information: Option<TypeRefDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRefDoc {
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_information: Option<TypeRefDoc>,
}

// ---- model -> view ----

impl From<&Specification> for SpecificationDoc {
    fn from(spec: &Specification) -> Self {
        Self {
            comment: spec.comment().map(str::to_string),
            areas: spec.areas().iter().map(AreaDoc::from).collect(),
        }
    }
}

impl From<&Area> for AreaDoc {
    fn from(area: &Area) -> Self {
        Self {
            name: area.name.clone(),
            number: area.number,
            version: area.version,
            comment: area.comment.clone(),
            data_types: area.data_types.iter().map(DataTypeDoc::from).collect(),
            errors: area.errors.iter().map(ErrorDefDoc::from).collect(),
            services: area.services.iter().map(ServiceDoc::from).collect(),
        }
    }
}

impl From<&Service> for ServiceDoc {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            number: service.number,
            comment: service.comment.clone(),
            data_types: service.data_types.iter().map(DataTypeDoc::from).collect(),
            errors: service.errors.iter().map(ErrorDefDoc::from).collect(),
            capability_sets: service
                .capability_sets
                .iter()
                .map(CapabilitySetDoc::from)
                .collect(),
        }
    }
}

impl From<&CapabilitySet> for CapabilitySetDoc {
    fn from(cs: &CapabilitySet) -> Self {
        Self {
            number: cs.number,
            comment: cs.comment.clone(),
            operations: cs.operations.iter().map(OperationDoc::from).collect(),
        }
    }
}

impl From<&Operation> for OperationDoc {
    fn from(op: &Operation) -> Self {
        Self {
            pattern: op.pattern().keyword().to_string(),
            name: op.name.clone(),
            number: op.number,
            comment: op.comment.clone(),
            supports_replay: op.supports_replay,
            messages: op
                .messages
                .stage_blocks()
                .into_iter()
                .map(|(name, stage)| (name.to_string(), StageDoc::from(stage)))
                .collect(),
            errors: op
                .messages
                .errors()
                .unwrap_or_default()
                .iter()
                .map(ErrorRefDoc::from)
                .collect(),
        }
    }
}

impl From<&Stage> for StageDoc {
    fn from(stage: &Stage) -> Self {
        Self {
            comment: stage.comment.clone(),
            fields: stage.fields.iter().map(FieldDoc::from).collect(),
        }
    }
}

impl From<&TypeReference> for TypeRefDoc {
    fn from(r: &TypeReference) -> Self {
        Self {
            area: r.area.clone(),
            service: r.service.clone(),
            name: r.name.clone(),
            list: r.list,
        }
    }
}

impl From<&Field> for FieldDoc {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            type_ref: TypeRefDoc::from(&field.type_ref),
            can_be_null: field.nullable,
            comment: field.comment.clone(),
        }
    }
}

impl From<&DataType> for DataTypeDoc {
    fn from(data_type: &DataType) -> Self {
        match data_type {
            DataType::Fundamental(t) => DataTypeDoc::Fundamental {
                name: t.name.clone(),
                comment: t.comment.clone(),
                extends: t.extends.as_ref().map(TypeRefDoc::from),
            },
            DataType::Attribute(t) => DataTypeDoc::Attribute {
                name: t.name.clone(),
                comment: t.comment.clone(),
                short_form_part: t.short_form,
            },
            DataType::Enumeration(t) => DataTypeDoc::Enumeration {
                name: t.name.clone(),
                comment: t.comment.clone(),
                short_form_part: t.short_form,
                items: t
                    .items
                    .iter()
                    .map(|item| ItemDoc {
                        value: item.value.clone(),
                        nvalue: item.numeric_value,
                        comment: item.comment.clone(),
                    })
                    .collect(),
            },
            DataType::Composite(t) => DataTypeDoc::Composite {
                name: t.name.clone(),
                comment: t.comment.clone(),
                extends: t.extends.as_ref().map(TypeRefDoc::from),
                short_form_part: t.short_form,
                fields: t.fields.iter().map(FieldDoc::from).collect(),
            },
        }
    }
}

impl From<&ErrorDefinition> for ErrorDefDoc {
    fn from(e: &ErrorDefinition) -> Self {
        Self {
            name: e.name.clone(),
            number: e.number,
            comment: e.comment.clone(),
            extra_information: e.extra_information.as_ref().map(TypeRefDoc::from),
        }
    }
}

impl From<&ErrorReference> for ErrorRefDoc {
    fn from(e: &ErrorReference) -> Self {
        Self {
            area: e.area.clone(),
            service: e.service.clone(),
            name: e.name.clone(),
            comment: e.comment.clone(),
            extra_information: e.extra_information.as_ref().map(TypeRefDoc::from),
        }
    }
}

// ---- view -> model ----

fn malformed(message: String) -> CodecError {
    CodecError::Json(serde_json::Error::custom(message))
}

impl SpecificationDoc {
    /// Convert into a validated model.
    pub fn into_model(self) -> Result<Specification, CodecError> {
        let areas = self
            .areas
            .into_iter()
            .map(AreaDoc::into_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Specification::new(self.comment, areas)?)
    }
}

impl AreaDoc {
    fn into_model(self) -> Result<Area, CodecError> {
        Ok(Area {
            name: self.name,
            number: self.number,
            version: self.version,
            comment: self.comment,
            data_types: self.data_types.into_iter().map(DataTypeDoc::into_model).collect(),
            errors: self.errors.into_iter().map(ErrorDefDoc::into_model).collect(),
            services: self
                .services
                .into_iter()
                .map(ServiceDoc::into_model)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl ServiceDoc {
    fn into_model(self) -> Result<Service, CodecError> {
        let mut capability_sets = Vec::with_capacity(self.capability_sets.len());
        for cs in self.capability_sets {
            capability_sets.push(CapabilitySet {
                number: cs.number,
                comment: cs.comment,
                operations: cs
                    .operations
                    .into_iter()
                    .map(OperationDoc::into_model)
                    .collect::<Result<_, _>>()?,
            });
        }
        Ok(Service {
            name: self.name,
            number: self.number,
            comment: self.comment,
            data_types: self.data_types.into_iter().map(DataTypeDoc::into_model).collect(),
            errors: self.errors.into_iter().map(ErrorDefDoc::into_model).collect(),
            capability_sets,
        })
    }
}

impl OperationDoc {
    fn into_model(mut self) -> Result<Operation, CodecError> {
        let Some(pattern) = InteractionPattern::from_keyword(&self.pattern) else {
            return Err(malformed(format!(
                "operation `{}` has unknown interaction pattern `{}`",
                self.name, self.pattern
            )));
        };
        let names = pattern.stage_names();
        if let Some(unknown) = self.messages.keys().find(|k| !names.contains(&k.as_str())) {
            return Err(malformed(format!(
                "operation `{}`: `{unknown}` is not a stage of {} operations",
                self.name, self.pattern
            )));
        }
        if !pattern.has_errors() && !self.errors.is_empty() {
            return Err(malformed(format!(
                "operation `{}`: SEND operations cannot declare errors",
                self.name
            )));
        }
        let stages = names
            .iter()
            .map(|name| {
                self.messages
                    .shift_remove(*name)
                    .map(StageDoc::into_model)
                    .unwrap_or_default()
            })
            .collect();
        let errors = self.errors.into_iter().map(ErrorRefDoc::into_model).collect();
        Ok(Operation {
            name: self.name,
            number: self.number,
            comment: self.comment,
            supports_replay: self.supports_replay,
            messages: Messages::assemble(pattern, stages, errors),
        })
    }
}

impl StageDoc {
    fn into_model(self) -> Stage {
        Stage {
            comment: self.comment,
            fields: self.fields.into_iter().map(FieldDoc::into_model).collect(),
        }
    }
}

impl TypeRefDoc {
    fn into_model(self) -> TypeReference {
        TypeReference {
            area: self.area,
            service: self.service,
            name: self.name,
            list: self.list,
        }
    }
}

impl FieldDoc {
    fn into_model(self) -> Field {
        Field {
            name: self.name,
            type_ref: self.type_ref.into_model(),
            nullable: self.can_be_null,
            comment: self.comment,
        }
    }
}

impl DataTypeDoc {
    fn into_model(self) -> DataType {
        match self {
            DataTypeDoc::Fundamental {
                name,
                comment,
                extends,
            } => DataType::Fundamental(Fundamental {
                name,
                comment,
                extends: extends.map(TypeRefDoc::into_model),
            }),
            DataTypeDoc::Attribute {
                name,
                comment,
                short_form_part,
            } => DataType::Attribute(Attribute {
                name,
                comment,
                short_form: short_form_part,
            }),
            DataTypeDoc::Enumeration {
                name,
                comment,
                short_form_part,
                items,
            } => DataType::Enumeration(Enumeration {
                name,
                comment,
                short_form: short_form_part,
                items: items
                    .into_iter()
                    .map(|item| EnumItem {
                        value: item.value,
                        numeric_value: item.nvalue,
                        comment: item.comment,
                    })
                    .collect(),
            }),
            DataTypeDoc::Composite {
                name,
                comment,
                extends,
                short_form_part,
                fields,
            } => DataType::Composite(Composite {
                name,
                comment,
                extends: extends.map(TypeRefDoc::into_model),
                short_form: short_form_part,
                fields: fields.into_iter().map(FieldDoc::into_model).collect(),
            }),
        }
    }
}

impl ErrorDefDoc {
    fn into_model(self) -> ErrorDefinition {
        ErrorDefinition {
            name: self.name,
            number: self.number,
            comment: self.comment,
            extra_information: self.extra_information.map(TypeRefDoc::into_model),
        }
    }
}

impl ErrorRefDoc {
    fn into_model(self) -> ErrorReference {
        ErrorReference {
            area: self.area,
            service: self.service,
            name: self.name,
            comment: self.comment,
            extra_information: self.extra_information.map(TypeRefDoc::into_model),
        }
    }
}
