//! Fixed name tables and namespace helpers used by the synthesizer.

use crate::model::MAL_AREA;

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

pub const DEFAULT_NAMESPACE_BASE: &str = "http://www.ccsds.org/schema/malxml";

pub const FILE_EXTENSION: &str = "xsd";

/// MAL attribute name to the XSD primitive carrying its value.
pub const ATTRIBUTE_PRIMITIVES: [(&str, &str); 18] = [
    ("Blob", "hexBinary"),
    ("Boolean", "boolean"),
    ("Duration", "duration"),
    ("Float", "float"),
    ("Double", "double"),
    ("Identifier", "string"),
    ("Octet", "byte"),
    ("UOctet", "unsignedByte"),
    ("Short", "short"),
    ("UShort", "unsignedShort"),
    ("Integer", "int"),
    ("UInteger", "unsignedInt"),
    ("Long", "long"),
    ("ULong", "unsignedLong"),
    ("String", "string"),
    ("Time", "dateTime"),
    ("FineTime", "dateTime"),
    ("URI", "anyURI"),
];

/// Primitive for an attribute; unknown attributes are unconstrained.
pub fn primitive(attribute: &str) -> &'static str {
    ATTRIBUTE_PRIMITIVES
        .iter()
        .find(|(name, _)| *name == attribute)
        .map_or("anyType", |(_, primitive)| *primitive)
}

/// Base types every generated type derives from.
pub const ELEMENT_TYPE: &str = "Element";
pub const ATTRIBUTE_TYPE: &str = "Attribute";
pub const COMPOSITE_TYPE: &str = "Composite";
pub const BODY_TYPE: &str = "Body";

pub const LIST_SUFFIX: &str = "List";
pub const ENUM_SUFFIX: &str = "Enum";

pub fn namespace(base: &str, area: &str, service: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    match service {
        Some(service) => format!("{base}/{area}/{service}"),
        None => format!("{base}/{area}"),
    }
}

pub fn mal_namespace(base: &str) -> String {
    namespace(base, MAL_AREA, None)
}

/// `{Area}{Service}.xsd`
pub fn file_name(area: &str, service: Option<&str>) -> String {
    format!("{area}{}.{FILE_EXTENSION}", service.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builtin::MAL_ATTRIBUTES;

    #[test]
    fn test_every_mal_attribute_has_a_primitive() {
        for name in MAL_ATTRIBUTES {
            assert_ne!(primitive(name), "anyType", "{name}");
        }
        assert_eq!(primitive("Integer"), "int");
        assert_eq!(primitive("FineTime"), "dateTime");
        assert_eq!(primitive("Custom"), "anyType");
    }

    #[test]
    fn test_namespaces_and_file_names() {
        assert_eq!(namespace("urn:base/", "A", Some("S")), "urn:base/A/S");
        assert_eq!(mal_namespace(DEFAULT_NAMESPACE_BASE), "http://www.ccsds.org/schema/malxml/MAL");
        assert_eq!(file_name("A", Some("S")), "AS.xsd");
        assert_eq!(file_name("A", None), "A.xsd");
    }
}
