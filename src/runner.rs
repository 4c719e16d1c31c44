//! Ties loaders and generators together.
//!
//! The first loader accepting the inputs builds the model; every generator
//! then runs against it in order. A generator's files are written only once
//! it has produced all of them.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::canonical::{self, CanonicalCodec, CanonicalLoader, JsonCodec};
use crate::error::MosdlError;
use crate::model::Specification;
use crate::notation::{self, NotationLoader, ParseOptions, Parsed};
use crate::render::notation::{DocMode, print};
use crate::schema::{self, SchemaOptions};

/// Builds a model from input paths.
pub trait SpecLoader {
    fn name(&self) -> &'static str;

    /// Cheap check whether the inputs look like this loader's format.
    fn is_loadable(&self, inputs: &[PathBuf]) -> bool;

    fn load(&self, inputs: &[PathBuf]) -> Result<Parsed, MosdlError>;
}

/// A file produced by a generator, relative to the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Turns a model into another representation.
pub trait Generator {
    fn name(&self) -> &'static str;

    /// Whether the generator always produces exactly one file.
    fn single_file(&self) -> bool {
        true
    }

    fn generate(&self, spec: &Specification) -> Result<Vec<GeneratedFile>, MosdlError>;
}

/// `{FirstArea}{FirstService}`, or `None` for a unit without areas.
fn base_name(spec: &Specification) -> Option<String> {
    let area = spec.areas().first()?;
    let service = area.services.first().map_or("", |s| s.name.as_str());
    Some(format!("{}{}", area.name, service))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalGenerator;

impl Generator for CanonicalGenerator {
    fn name(&self) -> &'static str {
        "canonical"
    }

    fn generate(&self, spec: &Specification) -> Result<Vec<GeneratedFile>, MosdlError> {
        let stem = base_name(spec).unwrap_or_else(|| "spec".to_string());
        Ok(vec![GeneratedFile {
            name: format!("{stem}.{}", canonical::EXTENSION),
            contents: JsonCodec.encode(spec)?,
        }])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotationGenerator {
    pub doc_mode: DocMode,
}

impl Generator for NotationGenerator {
    fn name(&self) -> &'static str {
        "notation"
    }

    fn generate(&self, spec: &Specification) -> Result<Vec<GeneratedFile>, MosdlError> {
        let stem = base_name(spec).unwrap_or_else(|| "spec".to_string());
        Ok(vec![GeneratedFile {
            name: format!("{stem}.{}", notation::EXTENSION),
            contents: print(spec, self.doc_mode).into_bytes(),
        }])
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaGenerator {
    pub options: SchemaOptions,
}

impl Generator for SchemaGenerator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn single_file(&self) -> bool {
        false
    }

    fn generate(&self, spec: &Specification) -> Result<Vec<GeneratedFile>, MosdlError> {
        let docs = schema::synthesize(spec, &self.options)?;
        Ok(docs
            .into_iter()
            .map(|(name, doc)| GeneratedFile {
                name,
                contents: doc.to_xml().into_bytes(),
            })
            .collect())
    }
}

pub struct Runner {
    loaders: Vec<Box<dyn SpecLoader>>,
    generators: Vec<Box<dyn Generator>>,
}

/// What a run loaded and wrote.
#[derive(Debug)]
pub struct Outcome {
    pub parsed: Parsed,
    pub written: Vec<PathBuf>,
}

impl Runner {
    pub fn new(loaders: Vec<Box<dyn SpecLoader>>, generators: Vec<Box<dyn Generator>>) -> Self {
        Self {
            loaders,
            generators,
        }
    }

    /// Canonical and notation loaders, in that order.
    pub fn with_default_loaders(options: ParseOptions, generators: Vec<Box<dyn Generator>>) -> Self {
        Self::new(
            vec![
                Box::new(CanonicalLoader),
                Box::new(NotationLoader::new(options)),
            ],
            generators,
        )
    }

    pub fn load(&self, inputs: &[PathBuf]) -> Result<Parsed, MosdlError> {
        let Some(loader) = self.loaders.iter().find(|l| l.is_loadable(inputs)) else {
            return Err(MosdlError::NoLoader);
        };
        info!(loader = loader.name(), inputs = inputs.len(), "loading specification");
        loader.load(inputs)
    }

    /// Load `inputs` and run every generator into `target`.
    ///
    /// `target` is normally a directory. If it is not an existing directory,
    /// single-file generators write to it directly and the others write next
    /// to it.
    pub fn execute(&self, inputs: &[PathBuf], target: &Path) -> Result<Outcome, MosdlError> {
        let parsed = self.load(inputs)?;
        let mut written = Vec::new();
        for generator in &self.generators {
            debug!(generator = generator.name(), "running generator");
            let files = generator.generate(&parsed.spec)?;
            for file in files {
                let path = output_path(target, generator.single_file(), &file.name);
                write_file(&path, &file.contents)?;
                info!(generator = generator.name(), file = %path.display(), "wrote file");
                written.push(path);
            }
        }
        Ok(Outcome { parsed, written })
    }
}

fn output_path(target: &Path, single_file: bool, name: &str) -> PathBuf {
    if target.is_dir() {
        return target.join(name);
    }
    if single_file {
        return target.to_path_buf();
    }
    match target.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), MosdlError> {
    let io_err = |source| MosdlError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SOURCE: &str = "AREA Demo 9 1 { SERVICE Svc 1 { COMPOSITE Point 1 { x: Integer } } }";

    struct Failing;

    impl Generator for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn generate(&self, _spec: &Specification) -> Result<Vec<GeneratedFile>, MosdlError> {
            Err(MosdlError::NoLoader)
        }
    }

    #[test]
    fn test_no_loader_for_unknown_input() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("input.txt");
        std::fs::write(&file, SOURCE).unwrap();
        let runner = Runner::with_default_loaders(ParseOptions::default(), Vec::new());
        let err = runner.execute(&[file], dir.path()).unwrap_err();
        assert!(matches!(err, MosdlError::NoLoader));
    }

    #[test]
    fn test_writes_all_generators_into_directory() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("demo.mosdl");
        std::fs::write(&input, SOURCE).unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let runner = Runner::with_default_loaders(
            ParseOptions::default(),
            vec![
                Box::new(CanonicalGenerator),
                Box::new(NotationGenerator::default()),
                Box::new(SchemaGenerator::default()),
            ],
        );
        let outcome = runner.execute(&[input], &out).unwrap();
        let names: Vec<_> = outcome
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["DemoSvc.json", "DemoSvc.mosdl", "MAL.xsd", "DemoSvc.xsd"]
        );

        // The canonical output loads back through the canonical loader.
        let reloaded = runner.load(&[out.join("DemoSvc.json")]).unwrap();
        assert_eq!(reloaded.spec, outcome.parsed.spec);
    }

    #[test]
    fn test_single_file_target() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("demo.mosdl");
        std::fs::write(&input, SOURCE).unwrap();
        let target = dir.path().join("custom.json");

        let runner =
            Runner::with_default_loaders(ParseOptions::default(), vec![Box::new(CanonicalGenerator)]);
        let outcome = runner.execute(&[input], &target).unwrap();
        assert_eq!(outcome.written, vec![target.clone()]);
        assert!(target.is_file());
    }

    #[test]
    fn test_failing_generator_writes_nothing_and_stops() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("demo.mosdl");
        std::fs::write(&input, SOURCE).unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let runner = Runner::with_default_loaders(
            ParseOptions::default(),
            vec![Box::new(Failing), Box::new(CanonicalGenerator)],
        );
        assert!(runner.execute(&[input], &out).is_err());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_default_name_without_areas() {
        let spec = Specification::new(None, Vec::new()).unwrap();
        let files = CanonicalGenerator.generate(&spec).unwrap();
        assert_eq!(files[0].name, "spec.json");
    }
}
