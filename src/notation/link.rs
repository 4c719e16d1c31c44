//! Second build phase: merge the drafts of every file into one unit, check
//! uniqueness and resolve references.
//!
//! In recovery mode duplicates and unresolvable fields or references are
//! dropped and recorded instead of aborting.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::error::{ParseError, SemanticError};
use crate::model::resolve::{AreaNames, NameIndex, ScopeNames};
use crate::model::types::{
    Attribute, Composite, DataType, EnumItem, Enumeration, ErrorDefinition, ErrorReference,
    Field, Fundamental, TypeReference,
};
use crate::model::{Area, CapabilitySet, Messages, Operation, Scope, Service, Specification, Stage};
use crate::notation::ast::*;

pub fn link(
    units: Vec<UnitDraft>,
    recover: bool,
) -> Result<(Specification, Vec<ParseError>), ParseError> {
    let mut linker = Linker {
        recover,
        diagnostics: Vec::new(),
        names: NameIndex::default(),
    };

    let comments: Vec<String> = units.iter().filter_map(|u| u.comment.clone()).collect();
    let comment = (!comments.is_empty()).then(|| comments.join("\n"));

    let drafts: Vec<AreaDraft> = units.into_iter().flat_map(|u| u.areas).collect();
    let drafts = linker.dedupe_areas(drafts)?;
    linker.names = NameIndex::new(drafts.iter().map(area_names).collect());

    let mut areas = Vec::with_capacity(drafts.len());
    for draft in drafts {
        areas.push(linker.area(draft)?);
    }
    debug!(areas = areas.len(), "linked compilation unit");

    let spec = Specification::new(comment, areas)?;
    Ok((spec, linker.diagnostics))
}

fn scope_names<'a>(
    name: &str,
    types: impl Iterator<Item = &'a TypeDraft>,
    errors: impl Iterator<Item = &'a ErrorDefDraft>,
) -> ScopeNames {
    let mut names = ScopeNames::new(name);
    names.types = types.map(|t| t.name.clone()).collect();
    names.errors = errors.map(|e| e.name.clone()).collect();
    names
}

fn area_names(area: &AreaDraft) -> AreaNames {
    AreaNames {
        names: scope_names(&area.name, area.data_types.iter(), area.errors.iter()),
        services: area
            .services
            .iter()
            .map(|s| scope_names(&s.name, s.data_types.iter(), s.errors.iter()))
            .collect(),
    }
}

fn describe(scope: Scope<'_>) -> String {
    match scope.service {
        Some(service) => format!("service `{}.{}`", scope.area, service),
        None => format!("area `{}`", scope.area),
    }
}

struct Linker {
    recover: bool,
    diagnostics: Vec<ParseError>,
    names: NameIndex,
}

impl Linker {
    fn report(&mut self, err: SemanticError) -> Result<(), ParseError> {
        if self.recover {
            self.diagnostics.push(err.into());
            Ok(())
        } else {
            Err(err.into())
        }
    }

    /// Keep the first item per key; later ones are conflicts. Items without
    /// a key never conflict.
    fn dedupe<T, K: Eq + Hash>(
        &mut self,
        items: Vec<T>,
        key: impl Fn(&T) -> Option<K>,
        conflict: impl Fn(&T) -> SemanticError,
    ) -> Result<Vec<T>, ParseError> {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if let Some(k) = key(&item)
                && !seen.insert(k)
            {
                self.report(conflict(&item))?;
                continue;
            }
            kept.push(item);
        }
        Ok(kept)
    }

    fn dedupe_areas(&mut self, areas: Vec<AreaDraft>) -> Result<Vec<AreaDraft>, ParseError> {
        let scope = "the compilation unit";
        let areas = self.dedupe(
            areas,
            |a| Some(a.name.clone()),
            |a| SemanticError::DuplicateName {
                kind: "area",
                name: a.name.clone(),
                scope: scope.to_string(),
                location: Some(a.location.clone()),
            },
        )?;
        let areas = self.dedupe(
            areas,
            |a| Some(a.number),
            |a| SemanticError::DuplicateNumber {
                kind: "area",
                number: a.number,
                scope: scope.to_string(),
                location: Some(a.location.clone()),
            },
        )?;

        let mut deduped = Vec::with_capacity(areas.len());
        for mut area in areas {
            let scope = format!("area `{}`", area.name);
            area.data_types = self.dedupe_types(area.data_types, &scope)?;
            area.errors = self.dedupe_errors(area.errors, &scope)?;
            area.services = self.dedupe(
                area.services,
                |s| Some(s.name.clone()),
                |s| SemanticError::DuplicateName {
                    kind: "service",
                    name: s.name.clone(),
                    scope: scope.clone(),
                    location: Some(s.location.clone()),
                },
            )?;
            area.services = self.dedupe(
                area.services,
                |s| Some(s.number),
                |s| SemanticError::DuplicateNumber {
                    kind: "service",
                    number: s.number,
                    scope: scope.clone(),
                    location: Some(s.location.clone()),
                },
            )?;
            for service in &mut area.services {
                let scope = format!("service `{}.{}`", area.name, service.name);
                service.data_types = self.dedupe_types(std::mem::take(&mut service.data_types), &scope)?;
                service.errors = self.dedupe_errors(std::mem::take(&mut service.errors), &scope)?;
                service.capability_sets = self.dedupe(
                    std::mem::take(&mut service.capability_sets),
                    |cs| Some(cs.number),
                    |cs| SemanticError::DuplicateNumber {
                        kind: "capability set",
                        number: cs.number,
                        scope: scope.clone(),
                        location: Some(cs.location.clone()),
                    },
                )?;
            }
            deduped.push(area);
        }
        Ok(deduped)
    }

    fn dedupe_types(&mut self, types: Vec<TypeDraft>, scope: &str) -> Result<Vec<TypeDraft>, ParseError> {
        let types = self.dedupe(
            types,
            |t| Some(t.name.clone()),
            |t| SemanticError::DuplicateName {
                kind: "data type",
                name: t.name.clone(),
                scope: scope.to_string(),
                location: Some(t.location.clone()),
            },
        )?;
        let short_form = |t: &TypeDraft| match &t.body {
            TypeBody::Fundamental { .. } => None,
            TypeBody::Attribute { short_form }
            | TypeBody::Enumeration { short_form, .. }
            | TypeBody::Composite { short_form, .. } => *short_form,
        };
        self.dedupe(types, short_form, |t| SemanticError::DuplicateNumber {
            kind: "data type short form",
            number: short_form(t).unwrap_or_default(),
            scope: scope.to_string(),
            location: Some(t.location.clone()),
        })
    }

    fn dedupe_errors(
        &mut self,
        errors: Vec<ErrorDefDraft>,
        scope: &str,
    ) -> Result<Vec<ErrorDefDraft>, ParseError> {
        let errors = self.dedupe(
            errors,
            |e| Some(e.name.clone()),
            |e| SemanticError::DuplicateName {
                kind: "error",
                name: e.name.clone(),
                scope: scope.to_string(),
                location: Some(e.location.clone()),
            },
        )?;
        self.dedupe(
            errors,
            |e| Some(e.number),
            |e| SemanticError::DuplicateNumber {
                kind: "error",
                number: e.number,
                scope: scope.to_string(),
                location: Some(e.location.clone()),
            },
        )
    }

    fn type_ref(&mut self, raw: &RawRef, scope: Scope<'_>) -> Result<Option<TypeReference>, ParseError> {
        let found = match raw.parts.as_slice() {
            [name] => self.names.resolve_type(scope, name),
            [area, name] => {
                if !self.names.has_area(area) {
                    return self.invalid(raw, format!("no area named `{area}`"));
                }
                self.names
                    .has_type(area, None, name)
                    .then(|| TypeReference::new(area.as_str(), name.as_str()))
            }
            [area, service, name] => {
                if !self.names.has_service(area, service) {
                    return self.invalid(raw, format!("no service named `{area}.{service}`"));
                }
                self.names
                    .has_type(area, Some(service), name)
                    .then(|| TypeReference::in_service(area.as_str(), service.as_str(), name.as_str()))
            }
            _ => None,
        };
        match found {
            Some(reference) if raw.list => Ok(Some(reference.into_list())),
            Some(reference) => Ok(Some(reference)),
            None => {
                self.report(SemanticError::UnresolvedType {
                    reference: raw.dotted(),
                    scope: describe(scope),
                    location: Some(raw.location.clone()),
                })?;
                Ok(None)
            }
        }
    }

    fn invalid<T>(&mut self, raw: &RawRef, reason: String) -> Result<Option<T>, ParseError> {
        self.report(SemanticError::InvalidReference {
            reference: raw.dotted(),
            reason,
            location: Some(raw.location.clone()),
        })?;
        Ok(None)
    }

    fn error_ref(
        &mut self,
        draft: ErrorRefDraft,
        scope: Scope<'_>,
    ) -> Result<Option<ErrorReference>, ParseError> {
        let raw = &draft.target;
        let found = match raw.parts.as_slice() {
            [name] => self
                .names
                .resolve_error(scope, name)
                .map(|target| (target.area, target.service, name.clone())),
            [area, name] => {
                if !self.names.has_area(area) {
                    return self.invalid(raw, format!("no area named `{area}`"));
                }
                self.names
                    .has_error(area, None, name)
                    .then(|| (area.clone(), None, name.clone()))
            }
            [area, service, name] => {
                if !self.names.has_service(area, service) {
                    return self.invalid(raw, format!("no service named `{area}.{service}`"));
                }
                self.names
                    .has_error(area, Some(service), name)
                    .then(|| (area.clone(), Some(service.clone()), name.clone()))
            }
            _ => None,
        };
        let Some((area, service, name)) = found else {
            self.report(SemanticError::UnresolvedError {
                reference: raw.dotted(),
                scope: describe(scope),
                location: Some(raw.location.clone()),
            })?;
            return Ok(None);
        };
        let extra_information = match &draft.extra_information {
            Some(extra) => self.type_ref(extra, scope)?,
            None => None,
        };
        Ok(Some(ErrorReference {
            area,
            service,
            name,
            comment: draft.comment,
            extra_information,
        }))
    }

    fn fields(
        &mut self,
        drafts: Vec<FieldDraft>,
        scope: Scope<'_>,
        owner: &str,
    ) -> Result<Vec<Field>, ParseError> {
        let drafts = self.dedupe(
            drafts,
            |f| Some(f.name.clone()),
            |f| SemanticError::DuplicateName {
                kind: "field",
                name: f.name.clone(),
                scope: owner.to_string(),
                location: Some(f.location.clone()),
            },
        )?;
        let mut fields = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if let Some(type_ref) = self.type_ref(&draft.type_ref, scope)? {
                fields.push(Field {
                    name: draft.name,
                    type_ref,
                    nullable: draft.nullable,
                    comment: draft.comment,
                });
            }
        }
        Ok(fields)
    }

    fn errors(
        &mut self,
        drafts: Vec<ErrorDefDraft>,
        scope: Scope<'_>,
    ) -> Result<Vec<ErrorDefinition>, ParseError> {
        let mut errors = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let extra_information = match &draft.extra_information {
                Some(extra) => self.type_ref(extra, scope)?,
                None => None,
            };
            errors.push(ErrorDefinition {
                name: draft.name,
                number: draft.number,
                comment: draft.comment,
                extra_information,
            });
        }
        Ok(errors)
    }

    fn data_type(&mut self, draft: TypeDraft, scope: Scope<'_>) -> Result<DataType, ParseError> {
        let TypeDraft {
            name,
            comment,
            body,
            ..
        } = draft;
        let data_type = match body {
            TypeBody::Fundamental { extends } => {
                let extends = match &extends {
                    Some(parent) => self.type_ref(parent, scope)?,
                    None => None,
                };
                DataType::Fundamental(Fundamental {
                    name,
                    comment,
                    extends,
                })
            }
            TypeBody::Attribute { short_form } => DataType::Attribute(Attribute {
                name,
                comment,
                short_form,
            }),
            TypeBody::Enumeration { short_form, items } => {
                let owner = format!("enumeration `{name}`");
                let items = self.dedupe(
                    items,
                    |i| Some(i.value.clone()),
                    |i| SemanticError::DuplicateName {
                        kind: "enumeration item",
                        name: i.value.clone(),
                        scope: owner.clone(),
                        location: Some(i.location.clone()),
                    },
                )?;
                let items = self.dedupe(
                    items,
                    |i| i.numeric_value,
                    |i| SemanticError::DuplicateNumber {
                        kind: "enumeration item",
                        number: i.numeric_value.unwrap_or_default(),
                        scope: owner.clone(),
                        location: Some(i.location.clone()),
                    },
                )?;
                DataType::Enumeration(Enumeration {
                    name,
                    comment,
                    short_form,
                    items: items
                        .into_iter()
                        .map(|i| EnumItem {
                            value: i.value,
                            numeric_value: i.numeric_value,
                            comment: i.comment,
                        })
                        .collect(),
                })
            }
            TypeBody::Composite {
                short_form,
                extends,
                fields,
            } => {
                let extends = match &extends {
                    Some(parent) => self.type_ref(parent, scope)?,
                    None => None,
                };
                let fields = self.fields(fields, scope, &format!("composite `{name}`"))?;
                DataType::Composite(Composite {
                    name,
                    comment,
                    extends,
                    short_form,
                    fields,
                })
            }
        };
        Ok(data_type)
    }

    fn operation(&mut self, draft: OperationDraft, scope: Scope<'_>) -> Result<Operation, ParseError> {
        let owner = format!("operation `{}`", draft.name);
        let names = draft.pattern.stage_names();
        let mut stages = Vec::with_capacity(draft.stages.len());
        for (stage_name, stage) in names.iter().zip(draft.stages) {
            let what = format!("stage `{stage_name}` of {owner}");
            stages.push(Stage {
                comment: stage.comment,
                fields: self.fields(stage.fields, scope, &what)?,
            });
        }

        let drafts = self.dedupe(
            draft.errors,
            |e| e.target.parts.last().cloned(),
            |e| SemanticError::DuplicateName {
                kind: "error reference",
                name: e.target.dotted(),
                scope: owner.clone(),
                location: Some(e.target.location.clone()),
            },
        )?;
        let mut errors = Vec::with_capacity(drafts.len());
        for error in drafts {
            if let Some(reference) = self.error_ref(error, scope)? {
                errors.push(reference);
            }
        }

        Ok(Operation {
            name: draft.name,
            number: draft.number,
            comment: draft.comment,
            supports_replay: draft.supports_replay,
            messages: Messages::assemble(draft.pattern, stages, errors),
        })
    }

    fn capability_set(
        &mut self,
        draft: CapabilitySetDraft,
        scope: Scope<'_>,
    ) -> Result<CapabilitySet, ParseError> {
        let owner = format!("capability set {} of {}", draft.number, describe(scope));
        let ops = self.dedupe(
            draft.operations,
            |op| Some(op.name.clone()),
            |op| SemanticError::DuplicateName {
                kind: "operation",
                name: op.name.clone(),
                scope: owner.clone(),
                location: Some(op.location.clone()),
            },
        )?;
        let ops = self.dedupe(
            ops,
            |op| Some(op.number),
            |op| SemanticError::DuplicateNumber {
                kind: "operation",
                number: op.number,
                scope: owner.clone(),
                location: Some(op.location.clone()),
            },
        )?;
        let mut operations = Vec::with_capacity(ops.len());
        for op in ops {
            operations.push(self.operation(op, scope)?);
        }
        Ok(CapabilitySet {
            number: draft.number,
            comment: draft.comment,
            operations,
        })
    }

    fn service(&mut self, area: &str, draft: ServiceDraft) -> Result<Service, ParseError> {
        let scope = Scope::service(area, &draft.name);
        let mut data_types = Vec::with_capacity(draft.data_types.len());
        for data_type in draft.data_types {
            data_types.push(self.data_type(data_type, scope)?);
        }
        let errors = self.errors(draft.errors, scope)?;
        let mut capability_sets = Vec::with_capacity(draft.capability_sets.len());
        for cs in draft.capability_sets {
            capability_sets.push(self.capability_set(cs, scope)?);
        }
        Ok(Service {
            name: draft.name.clone(),
            number: draft.number,
            comment: draft.comment,
            data_types,
            errors,
            capability_sets,
        })
    }

    fn area(&mut self, draft: AreaDraft) -> Result<Area, ParseError> {
        let scope = Scope::area(&draft.name);
        let mut data_types = Vec::with_capacity(draft.data_types.len());
        for data_type in draft.data_types {
            data_types.push(self.data_type(data_type, scope)?);
        }
        let errors = self.errors(draft.errors, scope)?;
        let mut services = Vec::with_capacity(draft.services.len());
        for service in draft.services {
            services.push(self.service(&draft.name, service)?);
        }
        Ok(Area {
            name: draft.name,
            number: draft.number,
            version: draft.version,
            comment: draft.comment,
            data_types,
            errors,
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parser::parse_source;
    use indoc::indoc;

    fn link_sources(sources: &[&str], recover: bool) -> Result<(Specification, Vec<ParseError>), ParseError> {
        let units = sources
            .iter()
            .map(|s| parse_source(s, None, recover).map(|(unit, _)| unit))
            .collect::<Result<Vec<_>, _>>()?;
        link(units, recover)
    }

    #[test]
    fn test_forward_and_cross_file_references() {
        let (spec, diagnostics) = link_sources(
            &[
                "AREA A 1 1 { COMPOSITE Uses 1 { later: Later  other: Remote[] } COMPOSITE Later 2 { } }",
                "AREA B 2 1 { COMPOSITE Remote 1 { } }",
            ],
            false,
        )
        .unwrap();
        assert!(diagnostics.is_empty());
        let Some(DataType::Composite(uses)) = spec.areas()[0].data_type("Uses") else {
            panic!("Uses missing");
        };
        assert_eq!(uses.fields[0].type_ref, TypeReference::new("A", "Later"));
        assert_eq!(uses.fields[1].type_ref, TypeReference::new("B", "Remote").into_list());
    }

    #[test]
    fn test_qualified_and_builtin_references() {
        let (spec, _) = link_sources(
            &[indoc! {"
                AREA A 1 1 {
                    SERVICE S 1 {
                        ENUM Mode 1 { ON OFF }
                        CAPABILITYSET 1 {
                            SUBMIT set 1 {
                                submit { mode: A.S.Mode  at: MAL.Time }
                                ERRORS { INTERNAL MAL.TOO_MANY EXTRA String }
                            }
                        }
                    }
                }
            "}],
            false,
        )
        .unwrap();
        let op = &spec.areas()[0].services[0].capability_sets[0].operations[0];
        let (_, submit) = op.messages.stage_blocks()[0];
        assert_eq!(submit.fields[0].type_ref, TypeReference::in_service("A", "S", "Mode"));
        assert_eq!(submit.fields[1].type_ref, TypeReference::mal("Time"));
        let errors = op.messages.errors().unwrap();
        assert_eq!(errors[0].qualified_name(), "MAL.INTERNAL");
        assert_eq!(
            errors[1].extra_information,
            Some(TypeReference::mal("String"))
        );
    }

    #[test]
    fn test_unresolved_type_carries_location() {
        let err = link_sources(&["AREA A 1 1 {\n COMPOSITE C 1 {\n x: Missing\n }\n}"], false).unwrap_err();
        let ParseError::Semantic(SemanticError::UnresolvedType { reference, location, .. }) = err else {
            panic!("expected an unresolved type");
        };
        assert_eq!(reference, "Missing");
        assert_eq!(location.map(|l| l.line), Some(3));
    }

    #[test]
    fn test_unknown_area_is_invalid_reference() {
        let err = link_sources(&["AREA A 1 1 { COMPOSITE C 1 { x: Nowhere.T } }"], false).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Semantic(SemanticError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_area_across_files() {
        let err = link_sources(&["AREA A 1 1 { }", "AREA A 2 1 { }"], false).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Semantic(SemanticError::DuplicateName { kind: "area", .. })
        ));
    }

    #[test]
    fn test_recovery_drops_bad_fields_and_duplicates() {
        let (spec, diagnostics) = link_sources(
            &[indoc! {"
                AREA A 1 1 {
                    COMPOSITE C 1 { ok: Integer  bad: Missing }
                    COMPOSITE C 2 { }
                    ERRORS { E 1  E 2 }
                }
            "}],
            true,
        )
        .unwrap();
        assert_eq!(diagnostics.len(), 3);
        let area = &spec.areas()[0];
        assert_eq!(area.data_types.len(), 1);
        let Some(DataType::Composite(c)) = area.data_type("C") else {
            panic!("C missing");
        };
        assert_eq!(c.fields.len(), 1);
        assert_eq!(area.errors.len(), 1);
    }

    #[test]
    fn test_unit_comments_are_joined() {
        let (spec, _) = link_sources(&["//! one\nAREA A 1 1 { }", "//! two\nAREA B 2 1 { }"], false).unwrap();
        assert_eq!(spec.comment(), Some("one\ntwo"));
    }
}
