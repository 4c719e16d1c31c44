//! Canonical interchange format.

pub mod view;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CodecError, MosdlError};
use crate::model::Specification;
use crate::notation::Parsed;
use crate::runner::SpecLoader;
use view::SpecificationDoc;

pub const EXTENSION: &str = "json";

/// Reads and writes the canonical form of a model.
pub trait CanonicalCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Specification, CodecError>;
    fn encode(&self, spec: &Specification) -> Result<Vec<u8>, CodecError>;
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl CanonicalCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Specification, CodecError> {
        let doc: SpecificationDoc = serde_json::from_slice(bytes)?;
        doc.into_model()
    }

    fn encode(&self, spec: &Specification) -> Result<Vec<u8>, CodecError> {
        let mut bytes = serde_json::to_vec_pretty(&SpecificationDoc::from(spec))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn is_canonical_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalLoader;

impl SpecLoader for CanonicalLoader {
    fn name(&self) -> &'static str {
        "canonical"
    }

    /// Exactly one `.json` file.
    fn is_loadable(&self, inputs: &[PathBuf]) -> bool {
        matches!(inputs, [path] if is_canonical_file(path))
    }

    fn load(&self, inputs: &[PathBuf]) -> Result<Parsed, MosdlError> {
        let [path] = inputs else {
            return Err(MosdlError::NoLoader);
        };
        let bytes = std::fs::read(path).map_err(|source| MosdlError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(file = %path.display(), bytes = bytes.len(), "decoding canonical document");
        let spec = JsonCodec.decode(&bytes)?;
        Ok(Parsed {
            spec,
            diagnostics: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{ParseOptions, parse_str};
    use indoc::indoc;
    use serde_json::Value;

    fn encode(source: &str) -> Value {
        let spec = parse_str(source, ParseOptions::default()).unwrap().spec;
        serde_json::from_slice(&JsonCodec.encode(&spec).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_errors_are_omitted() {
        let json = encode(indoc! {"
            AREA A 1 1 { SERVICE S 1 { CAPABILITYSET 1 {
                SEND ping 1 { }
                REQUEST ask 2 { }
            } } }
        "});
        let area = &json["areas"][0];
        assert!(area.get("errors").is_none());
        assert!(area.get("dataTypes").is_some());
        let service = &area["services"][0];
        assert!(service.get("errors").is_none());
        let ops = &service["capabilitySets"][0]["operations"];
        assert!(ops[0].get("errors").is_none());
        assert!(ops[1].get("errors").is_none());
        assert_eq!(ops[1]["messages"]["response"]["fields"], Value::Array(Vec::new()));
    }

    #[test]
    fn test_present_errors_are_written() {
        let json = encode(indoc! {"
            AREA A 1 1 {
                ERRORS { BAD 1 }
                SERVICE S 1 {
                    ERRORS { WORSE 2 }
                    CAPABILITYSET 1 { SUBMIT go 1 { ERRORS { BAD WORSE } } }
                }
            }
        "});
        let area = &json["areas"][0];
        assert_eq!(area["errors"][0]["name"], "BAD");
        assert_eq!(area["services"][0]["errors"][0]["number"], 2);
        let refs = &area["services"][0]["capabilitySets"][0]["operations"][0]["errors"];
        assert_eq!(refs[0]["area"], "A");
        assert_eq!(refs[1]["service"], "S");
    }

    #[test]
    fn test_decode_validates_model() {
        let doc = r#"{"areas": [
            {"name": "A", "number": 1, "version": 1},
            {"name": "B", "number": 1, "version": 1}
        ]}"#;
        let err = JsonCodec.decode(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Invalid(_)));

        let err = JsonCodec.decode(b"{ not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_foreign_stage() {
        let doc = r#"{"areas": [{"name": "A", "number": 1, "version": 1, "services": [
            {"name": "S", "number": 1, "capabilitySets": [{"number": 1, "operations": [
                {"pattern": "SEND", "name": "x", "number": 1, "messages": {"response": {}}}
            ]}]}
        ]}]}"#;
        let err = JsonCodec.decode(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("not a stage of SEND"));
    }

    #[test]
    fn test_loader_accepts_single_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("spec.json");
        std::fs::write(&file, r#"{"areas": []}"#).unwrap();
        let loader = CanonicalLoader;
        assert!(loader.is_loadable(std::slice::from_ref(&file)));
        assert!(!loader.is_loadable(&[file.clone(), file.clone()]));
        assert!(!loader.is_loadable(&[dir.path().to_path_buf()]));
        assert!(loader.load(&[file]).unwrap().spec.areas().is_empty());
    }
}
