//! Draft declarations produced by the parser, before linking.
//!
//! Type and error references are still raw dotted paths; comments are
//! already attached to their owners.

use crate::error::Location;
use crate::model::InteractionPattern;

/// `Type`, `Area.Type` or `Area.Service.Type` as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRef {
    pub parts: Vec<String>,
    pub list: bool,
    pub location: Location,
}

impl RawRef {
    pub fn dotted(&self) -> String {
        let mut text = self.parts.join(".");
        if self.list {
            text.push_str("[]");
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDraft {
    pub name: String,
    pub type_ref: RawRef,
    pub nullable: bool,
    pub comment: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDraft {
    pub comment: Option<String>,
    pub fields: Vec<FieldDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub value: String,
    pub numeric_value: Option<u32>,
    pub comment: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBody {
    Fundamental {
        extends: Option<RawRef>,
    },
    Attribute {
        short_form: Option<u32>,
    },
    Enumeration {
        short_form: Option<u32>,
        items: Vec<ItemDraft>,
    },
    Composite {
        short_form: Option<u32>,
        extends: Option<RawRef>,
        fields: Vec<FieldDraft>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDraft {
    pub name: String,
    pub comment: Option<String>,
    pub body: TypeBody,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDefDraft {
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub extra_information: Option<RawRef>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRefDraft {
    pub target: RawRef,
    pub comment: Option<String>,
    pub extra_information: Option<RawRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDraft {
    pub pattern: InteractionPattern,
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub supports_replay: bool,
    /// One entry per stage of the pattern, in fixed order.
    pub stages: Vec<StageDraft>,
    pub errors: Vec<ErrorRefDraft>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySetDraft {
    pub number: u32,
    pub comment: Option<String>,
    pub operations: Vec<OperationDraft>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDraft {
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub data_types: Vec<TypeDraft>,
    pub errors: Vec<ErrorDefDraft>,
    pub capability_sets: Vec<CapabilitySetDraft>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaDraft {
    pub name: String,
    pub number: u32,
    pub version: u32,
    pub comment: Option<String>,
    pub data_types: Vec<TypeDraft>,
    pub errors: Vec<ErrorDefDraft>,
    pub services: Vec<ServiceDraft>,
    pub location: Location,
}

/// One parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitDraft {
    pub comment: Option<String>,
    pub areas: Vec<AreaDraft>,
}
