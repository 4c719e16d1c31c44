//! MOSDL notation front end.
//!
//! Build runs in two phases: every file is lexed and parsed into drafts,
//! then all drafts are linked into one `Specification`.

pub mod ast;
pub mod doc;
pub mod lexer;
pub mod link;
pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{MosdlError, ParseError};
use crate::model::Specification;
use crate::runner::SpecLoader;

pub const EXTENSION: &str = "mosdl";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Record errors and keep going instead of aborting on the first one.
    pub recover: bool,
}

/// A loaded model plus whatever was recovered from along the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub spec: Specification,
    pub diagnostics: Vec<ParseError>,
}

/// A named notation source held in memory.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: Option<Arc<str>>,
    pub text: String,
}

impl Source {
    pub fn anonymous(text: impl Into<String>) -> Self {
        Self {
            name: None,
            text: text.into(),
        }
    }
}

pub fn parse_str(text: &str, options: ParseOptions) -> Result<Parsed, ParseError> {
    parse_sources(&[Source::anonymous(text)], options)
}

pub fn parse_sources(sources: &[Source], options: ParseOptions) -> Result<Parsed, ParseError> {
    let mut units = Vec::with_capacity(sources.len());
    let mut diagnostics = Vec::new();
    for source in sources {
        let (unit, found) = parser::parse_source(&source.text, source.name.clone(), options.recover)?;
        debug!(
            file = source.name.as_deref().unwrap_or("<memory>"),
            areas = unit.areas.len(),
            "parsed notation source"
        );
        units.push(unit);
        diagnostics.extend(found);
    }
    let (spec, found) = link::link(units, options.recover)?;
    diagnostics.extend(found);
    for diagnostic in &diagnostics {
        warn!("recovered: {diagnostic}");
    }
    Ok(Parsed { spec, diagnostics })
}

fn has_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == EXTENSION)
}

fn dir_sources(dir: &Path) -> Result<Vec<PathBuf>, MosdlError> {
    let io_err = |source| MosdlError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && has_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Expand the inputs into notation files: directories contribute their
/// `*.mosdl` files sorted by name.
pub fn source_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, MosdlError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(dir_sources(input)?);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Cheap check: every input is a `.mosdl` file or a directory holding at
/// least one. Never parses and never fails.
pub fn is_loadable(inputs: &[PathBuf]) -> bool {
    !inputs.is_empty()
        && inputs.iter().all(|input| {
            if input.is_dir() {
                dir_sources(input).is_ok_and(|files| !files.is_empty())
            } else {
                input.is_file() && has_extension(input)
            }
        })
}

pub fn parse_paths(inputs: &[PathBuf], options: ParseOptions) -> Result<Parsed, MosdlError> {
    let mut sources = Vec::new();
    for path in source_files(inputs)? {
        let text = std::fs::read_to_string(&path).map_err(|source| MosdlError::Io {
            path: path.clone(),
            source,
        })?;
        sources.push(Source {
            name: Some(Arc::from(path.display().to_string())),
            text,
        });
    }
    Ok(parse_sources(&sources, options)?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotationLoader {
    pub options: ParseOptions,
}

impl NotationLoader {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl SpecLoader for NotationLoader {
    fn name(&self) -> &'static str {
        "notation"
    }

    fn is_loadable(&self, inputs: &[PathBuf]) -> bool {
        is_loadable(inputs)
    }

    fn load(&self, inputs: &[PathBuf]) -> Result<Parsed, MosdlError> {
        parse_paths(inputs, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_loadable() {
        let dir = tempdir().unwrap();
        assert!(!is_loadable(&[dir.path().to_path_buf()]));

        let file = dir.path().join("a.mosdl");
        std::fs::write(&file, "AREA A 1 1 { }").unwrap();
        let other = dir.path().join("a.json");
        std::fs::write(&other, "{}").unwrap();

        assert!(is_loadable(&[dir.path().to_path_buf()]));
        assert!(is_loadable(std::slice::from_ref(&file)));
        assert!(!is_loadable(&[other]));
        assert!(!is_loadable(&[dir.path().join("missing.mosdl")]));
        assert!(!is_loadable(&[]));
    }

    #[test]
    fn test_directory_files_sorted_by_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.mosdl"), "AREA B 2 1 { }").unwrap();
        std::fs::write(dir.path().join("a.mosdl"), "AREA A 1 1 { }").unwrap();
        let parsed = parse_paths(&[dir.path().to_path_buf()], ParseOptions::default()).unwrap();
        let names: Vec<_> = parsed.spec.areas().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_error_location_names_the_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("broken.mosdl");
        std::fs::write(&file, "AREA A 1 1 {\n  COMPOSITE\n}").unwrap();
        let err = parse_paths(&[file], ParseOptions::default()).unwrap_err();
        let MosdlError::Parse(err) = err else {
            panic!("expected a parse error");
        };
        let location = err.location().unwrap();
        assert!(location.file.as_deref().unwrap().ends_with("broken.mosdl"));
        assert_eq!(location.line, 3);
    }
}
