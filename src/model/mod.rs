//! Specification model: the validated, immutable representation every
//! loader produces and every generator consumes.

pub mod builtin;
pub mod resolve;
pub mod spec;
pub mod types;

mod validate;

pub use resolve::{ErrorTarget, Scope};
pub use spec::{
    Area, CapabilitySet, InteractionPattern, InteractionStage, Messages, Operation, Service,
    Specification, Stage,
};
pub use types::{
    Attribute, Composite, DataType, DataTypeKind, EnumItem, Enumeration, ErrorDefinition,
    ErrorReference, Field, Fundamental, MAL_AREA, TypeReference,
};
