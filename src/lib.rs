//! Compiler for MOSDL service specifications.
//!
//! A compilation unit is loaded from notation files or from its canonical
//! JSON form into a validated [`Specification`], which can then be printed
//! back as notation, encoded canonically or synthesized into XML Schema.

pub mod canonical;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logger;
pub mod model;
pub mod notation;
pub mod render;
pub mod runner;
pub mod schema;

use std::path::PathBuf;

pub use error::{MosdlError, Result};
pub use model::Specification;
pub use notation::{ParseOptions, Parsed};
pub use render::notation::DocMode;
pub use schema::{SchemaOptions, SchemaSet};

use canonical::{CanonicalCodec, JsonCodec};

/// Parse and link every notation file named by `inputs`; directories
/// contribute their `*.mosdl` files.
pub fn load_from_notation(inputs: &[PathBuf], options: ParseOptions) -> Result<Parsed> {
    notation::parse_paths(inputs, options)
}

pub fn load_from_canonical(bytes: &[u8]) -> Result<Specification> {
    Ok(JsonCodec.decode(bytes)?)
}

pub fn print_notation(spec: &Specification, mode: DocMode) -> Result<String> {
    Ok(render::notation::print(spec, mode))
}

pub fn synthesize_schema(spec: &Specification, options: &SchemaOptions) -> Result<SchemaSet> {
    Ok(schema::synthesize(spec, options)?)
}

pub fn encode_canonical(spec: &Specification) -> Result<Vec<u8>> {
    Ok(JsonCodec.encode(spec)?)
}
