//! Data types, fields and references.

use std::fmt;

/// Name of the built-in area every unit can reference implicitly.
pub const MAL_AREA: &str = "MAL";

/// Name of the schema attribute that carries a composite's short-form part.
/// A composite field must not reuse it.
pub const DISCRIMINANT_NAME: &str = "type";

/// Fully qualified reference to a data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    pub area: String,
    pub service: Option<String>,
    pub name: String,
    pub list: bool,
}

impl TypeReference {
    pub fn new(area: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            service: None,
            name: name.into(),
            list: false,
        }
    }

    pub fn in_service(
        area: impl Into<String>,
        service: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            service: Some(service.into()),
            name: name.into(),
            list: false,
        }
    }

    pub fn mal(name: impl Into<String>) -> Self {
        Self::new(MAL_AREA, name)
    }

    pub fn into_list(mut self) -> Self {
        self.list = true;
        self
    }

    /// The same reference with the list flag cleared.
    pub fn element(&self) -> Self {
        Self {
            list: false,
            ..self.clone()
        }
    }

    pub fn is_mal(&self) -> bool {
        self.area == MAL_AREA
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.area)?;
        if let Some(service) = &self.service {
            write!(f, "{}.", service)?;
        }
        write!(f, "{}", self.name)?;
        if self.list {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// A named, typed element of a composite or message. Order is wire position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub type_ref: TypeReference,
    pub nullable: bool,
    pub comment: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_ref: TypeReference) -> Self {
        Self {
            name: name.into(),
            type_ref,
            nullable: false,
            comment: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fundamental {
    pub name: String,
    pub comment: Option<String>,
    pub extends: Option<TypeReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub comment: Option<String>,
    pub short_form: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub value: String,
    pub numeric_value: Option<u32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub name: String,
    pub comment: Option<String>,
    pub short_form: Option<u32>,
    pub items: Vec<EnumItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    pub name: String,
    pub comment: Option<String>,
    pub extends: Option<TypeReference>,
    /// Short-form part. Its absence makes the composite abstract.
    pub short_form: Option<u32>,
    pub fields: Vec<Field>,
}

impl Composite {
    pub fn is_abstract(&self) -> bool {
        self.short_form.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeKind {
    Fundamental,
    Attribute,
    Enumeration,
    Composite,
}

impl DataTypeKind {
    pub fn describe(self) -> &'static str {
        match self {
            DataTypeKind::Fundamental => "fundamental",
            DataTypeKind::Attribute => "attribute",
            DataTypeKind::Enumeration => "enumeration",
            DataTypeKind::Composite => "composite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Fundamental(Fundamental),
    Attribute(Attribute),
    Enumeration(Enumeration),
    Composite(Composite),
}

impl DataType {
    pub fn name(&self) -> &str {
        match self {
            DataType::Fundamental(t) => &t.name,
            DataType::Attribute(t) => &t.name,
            DataType::Enumeration(t) => &t.name,
            DataType::Composite(t) => &t.name,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            DataType::Fundamental(t) => t.comment.as_deref(),
            DataType::Attribute(t) => t.comment.as_deref(),
            DataType::Enumeration(t) => t.comment.as_deref(),
            DataType::Composite(t) => t.comment.as_deref(),
        }
    }

    pub fn kind(&self) -> DataTypeKind {
        match self {
            DataType::Fundamental(_) => DataTypeKind::Fundamental,
            DataType::Attribute(_) => DataTypeKind::Attribute,
            DataType::Enumeration(_) => DataTypeKind::Enumeration,
            DataType::Composite(_) => DataTypeKind::Composite,
        }
    }

    pub fn is_abstract(&self) -> bool {
        match self {
            DataType::Fundamental(_) => true,
            DataType::Attribute(_) | DataType::Enumeration(_) => false,
            DataType::Composite(c) => c.is_abstract(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDefinition {
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub extra_information: Option<TypeReference>,
}

/// An operation's reference to an error declared by some area or service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReference {
    pub area: String,
    pub service: Option<String>,
    pub name: String,
    pub comment: Option<String>,
    pub extra_information: Option<TypeReference>,
}

impl ErrorReference {
    pub fn qualified_name(&self) -> String {
        match &self.service {
            Some(service) => format!("{}.{}.{}", self.area, service, self.name),
            None => format!("{}.{}", self.area, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_reference_display() {
        assert_eq!(TypeReference::mal("String").to_string(), "MAL.String");
        assert_eq!(
            TypeReference::in_service("A", "S", "T").into_list().to_string(),
            "A.S.T[]"
        );
    }

    #[test]
    fn test_composite_abstract_iff_no_short_form() {
        let mut c = Composite {
            name: "C".into(),
            comment: None,
            extends: None,
            short_form: None,
            fields: vec![],
        };
        assert!(c.is_abstract());
        c.short_form = Some(3);
        assert!(!DataType::Composite(c).is_abstract());
    }
}
