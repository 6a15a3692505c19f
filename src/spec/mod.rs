//! Core ML object model on top of the wire layer.
//!
//! This module owns:
//! - the `Model` / `ModelDescription` view and feature editing
//! - image feature types, color spaces and size flexibility
//! - neural-network layer records

pub mod feature;
pub mod layer;
pub mod model;
pub mod range;

pub use feature::{ColorSpace, FeatureDescription, FeatureRole, SizeFlexibility};
pub use layer::Layer;
pub use model::{MINIMUM_FLEXIBLE_SHAPES_VERSION, ModelDescription, ModelSpec};
pub use range::{ImageSizeRange, SizeRange};
