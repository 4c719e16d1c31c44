//! Name resolution shared by the notation linker and the printer.
//!
//! Unqualified names resolve in order: local service, local area, other
//! areas of the unit (declaration order), then the built-in MAL area. The
//! first match wins. A miss is `None`, never an error.

use std::collections::HashSet;

use crate::model::builtin;
use crate::model::spec::{Area, Specification};
use crate::model::types::{DataType, ErrorDefinition, MAL_AREA, TypeReference};

/// The area and optional service a name is looked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'a> {
    pub area: &'a str,
    pub service: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn area(area: &'a str) -> Self {
        Self {
            area,
            service: None,
        }
    }

    pub fn service(area: &'a str, service: &'a str) -> Self {
        Self {
            area,
            service: Some(service),
        }
    }
}

/// Where an error reference points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTarget {
    pub area: String,
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ScopeNames {
    pub name: String,
    pub types: HashSet<String>,
    pub errors: HashSet<String>,
}

impl ScopeNames {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn collect(name: &str, types: &[DataType], errors: &[ErrorDefinition]) -> Self {
        Self {
            name: name.to_string(),
            types: types.iter().map(|t| t.name().to_string()).collect(),
            errors: errors.iter().map(|e| e.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AreaNames {
    pub names: ScopeNames,
    pub services: Vec<ScopeNames>,
}

impl AreaNames {
    fn of(area: &Area) -> Self {
        Self {
            names: ScopeNames::collect(&area.name, &area.data_types, &area.errors),
            services: area
                .services
                .iter()
                .map(|s| ScopeNames::collect(&s.name, &s.data_types, &s.errors))
                .collect(),
        }
    }

    fn service(&self, name: &str) -> Option<&ScopeNames> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// Declared type and error names of a unit, in declaration order.
///
/// MAL always comes last: a unit-declared `MAL` area is moved behind the
/// other areas, otherwise the built-in area is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NameIndex {
    areas: Vec<AreaNames>,
}

impl NameIndex {
    pub fn new(areas: Vec<AreaNames>) -> Self {
        let (mut areas, mal): (Vec<_>, Vec<_>) =
            areas.into_iter().partition(|a| a.names.name != MAL_AREA);
        if mal.is_empty() {
            areas.push(AreaNames::of(builtin::mal_area()));
        } else {
            areas.extend(mal);
        }
        Self { areas }
    }

    pub fn of_areas(areas: &[Area]) -> Self {
        Self::new(areas.iter().map(AreaNames::of).collect())
    }

    fn area(&self, name: &str) -> Option<&AreaNames> {
        self.areas.iter().find(|a| a.names.name == name)
    }

    fn scope(&self, area: &str, service: Option<&str>) -> Option<&ScopeNames> {
        let area = self.area(area)?;
        match service {
            Some(service) => area.service(service),
            None => Some(&area.names),
        }
    }

    pub fn has_area(&self, area: &str) -> bool {
        self.area(area).is_some()
    }

    pub fn has_service(&self, area: &str, service: &str) -> bool {
        self.area(area).is_some_and(|a| a.service(service).is_some())
    }

    pub fn has_type(&self, area: &str, service: Option<&str>, name: &str) -> bool {
        self.scope(area, service)
            .is_some_and(|s| s.types.contains(name))
    }

    pub fn has_error(&self, area: &str, service: Option<&str>, name: &str) -> bool {
        self.scope(area, service)
            .is_some_and(|s| s.errors.contains(name))
    }

    /// Candidate scopes for an unqualified name, in lookup order.
    fn candidates<'a>(&'a self, scope: Scope<'a>) -> impl Iterator<Item = (&'a str, Option<&'a str>)> {
        let local_service = scope.service.map(|s| (scope.area, Some(s)));
        let local_area = std::iter::once((scope.area, None));
        let others = self
            .areas
            .iter()
            .filter(move |a| a.names.name != scope.area)
            .map(|a| (a.names.name.as_str(), None));
        local_service.into_iter().chain(local_area).chain(others)
    }

    pub fn resolve_type(&self, scope: Scope<'_>, name: &str) -> Option<TypeReference> {
        self.candidates(scope)
            .find(|(area, service)| self.has_type(area, *service, name))
            .map(|(area, service)| TypeReference {
                area: area.to_string(),
                service: service.map(str::to_string),
                name: name.to_string(),
                list: false,
            })
    }

    pub fn resolve_error(&self, scope: Scope<'_>, name: &str) -> Option<ErrorTarget> {
        self.candidates(scope)
            .find(|(area, service)| self.has_error(area, *service, name))
            .map(|(area, service)| ErrorTarget {
                area: area.to_string(),
                service: service.map(str::to_string),
            })
    }
}

impl Specification {
    /// An area of the unit, or the built-in MAL area when the unit has none.
    pub fn find_area(&self, name: &str) -> Option<&Area> {
        self.area(name).or_else(|| {
            let mal = builtin::mal_area();
            (name == MAL_AREA).then_some(mal)
        })
    }

    pub fn find_type(&self, reference: &TypeReference) -> Option<&DataType> {
        let area = self.find_area(&reference.area)?;
        match &reference.service {
            Some(service) => area.service(service)?.data_type(&reference.name),
            None => area.data_type(&reference.name),
        }
    }

    pub fn find_error(
        &self,
        area: &str,
        service: Option<&str>,
        name: &str,
    ) -> Option<&ErrorDefinition> {
        let area = self.find_area(area)?;
        match service {
            Some(service) => area.service(service)?.error(name),
            None => area.error(name),
        }
    }

    pub fn resolve_type(&self, scope: Scope<'_>, name: &str) -> Option<TypeReference> {
        self.names().resolve_type(scope, name)
    }

    pub fn resolve_error(&self, scope: Scope<'_>, name: &str) -> Option<ErrorTarget> {
        self.names().resolve_error(scope, name)
    }
}
