// Core type definitions for the loadweave system
//
// This crate holds the pure data model shared by the rest of the
// workspace: resource descriptors, URL normalization, and the
// identifier types used to correlate asynchronous load outcomes.

mod descriptor;
mod ident;
mod normalize;

pub use descriptor::{ResourceDescriptor, ResourceKind};
pub use ident::{CorrelationTag, UnitId};
pub use normalize::{is_absolute, normalize, NormalizerConfig};
