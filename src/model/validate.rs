//! Structural invariants checked by `Specification::new`.
//!
//! Rules:
//! - names and numbers are unique within their immediate parent scope
//! - numbers are positive (areas also need a positive version)
//! - a composite discriminant is never 0 and no field reuses its name
//! - services only declare composites and enumerations

use std::collections::HashSet;
use std::hash::Hash;

use crate::error::SemanticError;
use crate::model::spec::{Area, CapabilitySet, Operation, Service};
use crate::model::types::{DISCRIMINANT_NAME, DataType, ErrorDefinition, Field};

/// Indexes of the items whose key was already seen earlier in the slice.
fn repeated<'a, T, K, F>(items: &'a [T], key: F) -> Vec<usize>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .enumerate()
        .filter(|&(_, item)| !seen.insert(key(item)))
        .map(|(idx, _)| idx)
        .collect()
}

fn unique_names<T>(
    items: &[T],
    kind: &'static str,
    scope: &str,
    name: impl Fn(&T) -> &str,
) -> Result<(), SemanticError> {
    match repeated(items, &name).first() {
        Some(&idx) => Err(SemanticError::DuplicateName {
            kind,
            name: name(&items[idx]).to_string(),
            scope: scope.to_string(),
            location: None,
        }),
        None => Ok(()),
    }
}

fn unique_numbers<T>(
    items: &[T],
    kind: &'static str,
    scope: &str,
    number: impl Fn(&T) -> Option<u32>,
) -> Result<(), SemanticError> {
    let numbered: Vec<u32> = items.iter().filter_map(&number).collect();
    match repeated(&numbered, |n| *n).first() {
        Some(&idx) => Err(SemanticError::DuplicateNumber {
            kind,
            number: numbered[idx],
            scope: scope.to_string(),
            location: None,
        }),
        None => Ok(()),
    }
}

fn positive(kind: &'static str, name: &str, number: u32) -> Result<(), SemanticError> {
    if number == 0 {
        return Err(SemanticError::NonPositiveNumber {
            kind,
            name: name.to_string(),
            location: None,
        });
    }
    Ok(())
}

pub(crate) fn check_areas(areas: &[Area]) -> Result<(), SemanticError> {
    unique_names(areas, "area", "the compilation unit", |a| a.name.as_str())?;
    unique_numbers(areas, "area", "the compilation unit", |a| Some(a.number))?;

    for area in areas {
        positive("area", &area.name, area.number)?;
        positive("area version", &area.name, area.version)?;
        let scope = format!("area `{}`", area.name);

        check_data_types(&area.data_types, &scope)?;
        check_errors(&area.errors, &scope)?;

        unique_names(&area.services, "service", &scope, |s| s.name.as_str())?;
        unique_numbers(&area.services, "service", &scope, |s| Some(s.number))?;
        for service in &area.services {
            check_service(area, service)?;
        }
    }
    Ok(())
}

fn check_service(area: &Area, service: &Service) -> Result<(), SemanticError> {
    positive("service", &service.name, service.number)?;
    let scope = format!("service `{}.{}`", area.name, service.name);

    for data_type in &service.data_types {
        if matches!(data_type, DataType::Fundamental(_) | DataType::Attribute(_)) {
            return Err(SemanticError::MisplacedType {
                kind: data_type.kind().describe(),
                name: data_type.name().to_string(),
                scope,
                location: None,
            });
        }
    }
    check_data_types(&service.data_types, &scope)?;
    check_errors(&service.errors, &scope)?;

    unique_numbers(&service.capability_sets, "capability set", &scope, |cs| {
        Some(cs.number)
    })?;
    for capability_set in &service.capability_sets {
        check_capability_set(&scope, capability_set)?;
    }
    Ok(())
}

fn check_capability_set(service_scope: &str, cs: &CapabilitySet) -> Result<(), SemanticError> {
    positive("capability set", &cs.number.to_string(), cs.number)?;
    let scope = format!("capability set {} of {}", cs.number, service_scope);

    unique_names(&cs.operations, "operation", &scope, |op| op.name.as_str())?;
    unique_numbers(&cs.operations, "operation", &scope, |op| Some(op.number))?;
    for operation in &cs.operations {
        check_operation(operation)?;
    }
    Ok(())
}

fn check_operation(operation: &Operation) -> Result<(), SemanticError> {
    positive("operation", &operation.name, operation.number)?;
    for (stage_name, stage) in operation.messages.stage_blocks() {
        let scope = format!("stage `{}` of operation `{}`", stage_name, operation.name);
        check_fields(&stage.fields, &scope)?;
    }
    if let Some(errors) = operation.messages.errors() {
        let scope = format!("operation `{}`", operation.name);
        unique_names(errors, "error reference", &scope, |e| e.name.as_str())?;
    }
    Ok(())
}

fn check_fields(fields: &[Field], scope: &str) -> Result<(), SemanticError> {
    unique_names(fields, "field", scope, |f| f.name.as_str())
}

fn check_errors(errors: &[ErrorDefinition], scope: &str) -> Result<(), SemanticError> {
    unique_names(errors, "error", scope, |e| e.name.as_str())?;
    unique_numbers(errors, "error", scope, |e| Some(e.number))?;
    for error in errors {
        positive("error", &error.name, error.number)?;
    }
    Ok(())
}

fn check_data_types(types: &[DataType], scope: &str) -> Result<(), SemanticError> {
    unique_names(types, "data type", scope, DataType::name)?;
    unique_numbers(types, "data type short form", scope, |t| match t {
        DataType::Attribute(a) => a.short_form,
        DataType::Enumeration(e) => e.short_form,
        DataType::Composite(c) => c.short_form,
        DataType::Fundamental(_) => None,
    })?;

    for data_type in types {
        match data_type {
            DataType::Fundamental(_) => {}
            DataType::Attribute(attribute) => {
                if let Some(sf) = attribute.short_form {
                    positive("attribute", &attribute.name, sf)?;
                }
            }
            DataType::Enumeration(enumeration) => {
                if let Some(sf) = enumeration.short_form {
                    positive("enumeration", &enumeration.name, sf)?;
                }
                let scope = format!("enumeration `{}`", enumeration.name);
                unique_names(&enumeration.items, "enumeration item", &scope, |i| i.value.as_str())?;
                unique_numbers(&enumeration.items, "enumeration item", &scope, |i| {
                    i.numeric_value
                })?;
            }
            DataType::Composite(composite) => {
                if composite.short_form == Some(0) {
                    return Err(SemanticError::InconsistentDiscriminant {
                        composite: composite.name.clone(),
                        reason: "short form must be positive".to_string(),
                        location: None,
                    });
                }
                if composite.fields.iter().any(|f| f.name == DISCRIMINANT_NAME) {
                    return Err(SemanticError::InconsistentDiscriminant {
                        composite: composite.name.clone(),
                        reason: format!(
                            "field `{}` collides with the discriminant attribute",
                            DISCRIMINANT_NAME
                        ),
                        location: None,
                    });
                }
                check_fields(&composite.fields, &format!("composite `{}`", composite.name))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spec::{InteractionPattern, Messages, Specification, Stage};
    use crate::model::types::{Attribute, Composite, Enumeration, EnumItem, TypeReference};

    fn area(name: &str, number: u32) -> Area {
        Area {
            name: name.into(),
            number,
            version: 1,
            comment: None,
            data_types: vec![],
            errors: vec![],
            services: vec![],
        }
    }

    fn service(name: &str, number: u32) -> Service {
        Service {
            name: name.into(),
            number,
            comment: None,
            data_types: vec![],
            errors: vec![],
            capability_sets: vec![],
        }
    }

    fn composite(name: &str, short_form: Option<u32>, fields: Vec<Field>) -> DataType {
        DataType::Composite(Composite {
            name: name.into(),
            comment: None,
            extends: None,
            short_form,
            fields,
        })
    }

    #[test]
    fn test_repeated_reports_later_occurrences() {
        assert_eq!(repeated(&[1, 2, 1, 3, 2], |n| *n), vec![2, 4]);
    }

    #[test]
    fn test_duplicate_area_number() {
        let err = Specification::new(None, vec![area("A", 1), area("B", 1)]).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateNumber { number: 1, .. }));
    }

    #[test]
    fn test_duplicate_service_name() {
        let mut a = area("A", 1);
        a.services = vec![service("S", 1), service("S", 2)];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateName { kind: "service", .. }));
    }

    #[test]
    fn test_zero_area_number_rejected() {
        let err = Specification::new(None, vec![area("A", 0)]).unwrap_err();
        assert!(matches!(err, SemanticError::NonPositiveNumber { .. }));
    }

    #[test]
    fn test_discriminant_zero_rejected() {
        let mut a = area("A", 1);
        a.data_types = vec![composite("C", Some(0), vec![])];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::InconsistentDiscriminant { .. }));
    }

    #[test]
    fn test_field_named_type_rejected() {
        let mut a = area("A", 1);
        a.data_types = vec![composite(
            "C",
            Some(1),
            vec![Field::new("type", TypeReference::mal("Integer"))],
        )];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::InconsistentDiscriminant { .. }));
    }

    #[test]
    fn test_attribute_in_service_rejected() {
        let mut s = service("S", 1);
        s.data_types = vec![DataType::Attribute(Attribute {
            name: "Weird".into(),
            comment: None,
            short_form: Some(1),
        })];
        let mut a = area("A", 1);
        a.services = vec![s];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::MisplacedType { kind: "attribute", .. }));
    }

    #[test]
    fn test_duplicate_enum_item() {
        let mut a = area("A", 1);
        a.data_types = vec![DataType::Enumeration(Enumeration {
            name: "E".into(),
            comment: None,
            short_form: Some(1),
            items: vec![
                EnumItem {
                    value: "X".into(),
                    numeric_value: Some(1),
                    comment: None,
                },
                EnumItem {
                    value: "X".into(),
                    numeric_value: Some(2),
                    comment: None,
                },
            ],
        })];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateName { kind: "enumeration item", .. }));
    }

    #[test]
    fn test_duplicate_stage_field() {
        let field = Field::new("x", TypeReference::mal("Integer"));
        let op = Operation {
            name: "op".into(),
            number: 1,
            comment: None,
            supports_replay: false,
            messages: Messages::assemble(
                InteractionPattern::Send,
                vec![Stage::new(vec![field.clone(), field])],
                vec![],
            ),
        };
        let mut s = service("S", 1);
        s.capability_sets = vec![CapabilitySet {
            number: 1,
            comment: None,
            operations: vec![op],
        }];
        let mut a = area("A", 1);
        a.services = vec![s];
        let err = Specification::new(None, vec![a]).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateName { kind: "field", .. }));
    }

    #[test]
    fn test_valid_unit_accepted() {
        let mut a = area("A", 1);
        a.data_types = vec![composite(
            "C",
            Some(1),
            vec![Field::new("x", TypeReference::mal("Integer")).nullable()],
        )];
        a.services = vec![service("S", 1)];
        assert!(Specification::new(Some("unit".into()), vec![a, area("B", 2)]).is_ok());
    }
}
