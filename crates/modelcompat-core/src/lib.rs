//! Define data models once, validate them under either `jsonschema` API line.
//!
//! The crate has four layers:
//!
//! - [`capability`]: probes which validation line is linked and memoizes the
//!   result as a process-wide, write-once [`Capability`].
//! - [`FieldSpec`] / [`ModelConfig`] / [`ModelBuilder`]: the declaration
//!   surface. Finalizing a builder translates the declarations into the
//!   artifacts the active generation expects.
//! - [`ModelClass::validate`], [`ModelClass::to_json_schema`] and
//!   [`ValidatedModel::dump`]: the uniform facade.
//! - [`TypeAdapter`]: the same facade for bare field types.
//!
//! Observable behavior (defaults, extra-field policy, field order, schema
//! output, dumps) is the same under both generations.

pub mod adapter;
pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
mod facade;
pub mod field;
pub mod model;
mod native;
mod normalize;
mod schema;

pub use adapter::TypeAdapter;
pub use cache::ClassCache;
pub use capability::{
    Capability, CapabilityGap, DetectionSource, GapHandling, Generation, ProbeOptions,
    VersionProbe, OVERRIDE_ENV,
};
pub use config::{Extra, ModelConfig};
pub use error::{
    CompatError, ConstructionArgumentError, FieldFailure, FieldPath, PathSegment, Result,
    ValidationError,
};
pub use field::{FieldSpec, FieldType};
pub use model::{CallArgs, DumpOptions, FieldValue, ModelBuilder, ModelClass, ValidatedModel};
pub use normalize::FieldInfo;
