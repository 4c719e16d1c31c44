//! Text renderers for the model and for synthesized schema documents.

pub mod notation;
pub mod xsd;
