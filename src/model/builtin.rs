//! The built-in MAL area every compilation unit may reference.
//!
//! Built programmatically so the model never depends on a fallible parse at
//! startup. A unit that declares its own `MAL` area shadows this one.

use std::sync::LazyLock;

use crate::model::spec::Area;
use crate::model::types::{
    Attribute, Composite, DataType, EnumItem, Enumeration, ErrorDefinition, Field, Fundamental,
    MAL_AREA, TypeReference,
};

pub const MAL_AREA_NUMBER: u32 = 1;
pub const MAL_AREA_VERSION: u32 = 1;

/// MAL attribute names in short-form order (1..=18).
pub const MAL_ATTRIBUTES: [&str; 18] = [
    "Blob",
    "Boolean",
    "Duration",
    "Float",
    "Double",
    "Identifier",
    "Octet",
    "UOctet",
    "Short",
    "UShort",
    "Integer",
    "UInteger",
    "Long",
    "ULong",
    "String",
    "Time",
    "FineTime",
    "URI",
];

const MAL_ERRORS: [&str; 18] = [
    "DELIVERY_FAILED",
    "DELIVERY_TIMEDOUT",
    "DELIVERY_DELAYED",
    "DESTINATION_UNKNOWN",
    "DESTINATION_TRANSIENT",
    "DESTINATION_LOST",
    "AUTHENTICATION_FAIL",
    "AUTHORISATION_FAIL",
    "ENCRYPTION_FAIL",
    "UNSUPPORTED_AREA",
    "UNSUPPORTED_OPERATION",
    "UNSUPPORTED_VERSION",
    "BAD_ENCODING",
    "INTERNAL",
    "UNKNOWN",
    "INCORRECT_STATE",
    "TOO_MANY",
    "SHUTDOWN",
];

const MAL_ERROR_BASE: u32 = 65536;

static MAL: LazyLock<Area> = LazyLock::new(build);

pub fn mal_area() -> &'static Area {
    &MAL
}

fn fundamental(name: &str, extends: Option<&str>, comment: &str) -> DataType {
    DataType::Fundamental(Fundamental {
        name: name.to_string(),
        comment: Some(comment.to_string()),
        extends: extends.map(TypeReference::mal),
    })
}

fn enumeration(name: &str, short_form: u32, values: &[&str]) -> DataType {
    DataType::Enumeration(Enumeration {
        name: name.to_string(),
        comment: None,
        short_form: Some(short_form),
        items: values
            .iter()
            .zip(1u32..)
            .map(|(value, n)| EnumItem {
                value: value.to_string(),
                numeric_value: Some(n),
                comment: None,
            })
            .collect(),
    })
}

fn composite(name: &str, short_form: u32, fields: Vec<Field>) -> DataType {
    DataType::Composite(Composite {
        name: name.to_string(),
        comment: None,
        extends: None,
        short_form: Some(short_form),
        fields,
    })
}

fn field(name: &str, type_name: &str) -> Field {
    Field::new(name, TypeReference::mal(type_name))
}

fn list(name: &str, type_name: &str) -> Field {
    Field::new(name, TypeReference::mal(type_name).into_list())
}

fn build() -> Area {
    let mut data_types = vec![
        fundamental("Element", None, "Base of every MAL data type."),
        fundamental("Attribute", Some("Element"), "Base of the MAL attribute types."),
        fundamental("Composite", Some("Element"), "Base of every structured type."),
    ];

    data_types.extend(MAL_ATTRIBUTES.iter().zip(1u32..).map(|(name, sf)| {
        DataType::Attribute(Attribute {
            name: name.to_string(),
            comment: None,
            short_form: Some(sf),
        })
    }));

    data_types.extend([
        enumeration(
            "InteractionType",
            19,
            &["SEND", "SUBMIT", "REQUEST", "INVOKE", "PROGRESS", "PUBSUB"],
        ),
        enumeration("SessionType", 20, &["LIVE", "SIMULATION", "REPLAY"]),
        enumeration("QoSLevel", 21, &["BESTEFFORT", "ASSURED", "QUEUED", "TIMELY"]),
        enumeration(
            "UpdateType",
            22,
            &["CREATION", "UPDATE", "MODIFICATION", "DELETION"],
        ),
        composite(
            "Subscription",
            23,
            vec![
                field("subscriptionId", "Identifier"),
                list("entities", "EntityRequest"),
            ],
        ),
        composite(
            "EntityRequest",
            24,
            vec![
                list("subDomain", "Identifier").nullable(),
                field("allAreas", "Boolean"),
                field("allServices", "Boolean"),
                field("allOperations", "Boolean"),
                field("onlyOnChange", "Boolean"),
                list("entityKeys", "EntityKey"),
            ],
        ),
        composite(
            "EntityKey",
            25,
            vec![
                field("firstSubKey", "Identifier").nullable(),
                field("secondSubKey", "Long").nullable(),
                field("thirdSubKey", "Long").nullable(),
                field("fourthSubKey", "Long").nullable(),
            ],
        ),
        composite(
            "UpdateHeader",
            26,
            vec![
                field("timestamp", "Time"),
                field("sourceURI", "URI"),
                field("updateType", "UpdateType"),
                field("key", "EntityKey"),
            ],
        ),
        composite(
            "IdBooleanPair",
            27,
            vec![
                field("id", "Identifier").nullable(),
                field("value", "Boolean").nullable(),
            ],
        ),
        composite(
            "Pair",
            28,
            vec![
                field("first", "Attribute").nullable(),
                field("second", "Attribute").nullable(),
            ],
        ),
        composite(
            "NamedValue",
            29,
            vec![
                field("name", "Identifier").nullable(),
                field("value", "Attribute").nullable(),
            ],
        ),
        composite(
            "File",
            30,
            vec![
                field("name", "Identifier"),
                field("mimeType", "String").nullable(),
                field("creationDate", "Time").nullable(),
                field("modificationDate", "Time").nullable(),
                field("size", "ULong").nullable(),
                field("content", "Blob").nullable(),
                list("metaData", "NamedValue").nullable(),
            ],
        ),
    ]);

    let errors = MAL_ERRORS
        .iter()
        .zip(MAL_ERROR_BASE..)
        .map(|(name, number)| ErrorDefinition {
            name: name.to_string(),
            number,
            comment: None,
            extra_information: None,
        })
        .collect();

    Area {
        name: MAL_AREA.to_string(),
        number: MAL_AREA_NUMBER,
        version: MAL_AREA_VERSION,
        comment: Some("The MAL standard area.".to_string()),
        data_types,
        errors,
        services: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spec::Specification;

    #[test]
    fn test_builtin_area_is_valid() {
        assert!(Specification::new(None, vec![mal_area().clone()]).is_ok());
    }

    #[test]
    fn test_attribute_short_forms() {
        let area = mal_area();
        let Some(DataType::Attribute(uri)) = area.data_type("URI") else {
            panic!("URI missing");
        };
        assert_eq!(uri.short_form, Some(18));
        assert!(area.data_type("Composite").is_some_and(DataType::is_abstract));
    }

    #[test]
    fn test_error_numbers() {
        let area = mal_area();
        assert_eq!(area.error("DELIVERY_FAILED").map(|e| e.number), Some(65536));
        assert_eq!(area.error("SHUTDOWN").map(|e| e.number), Some(65553));
    }
}
