//! Vector data structures: class codes, features and feature collections

mod class;
mod feature;

pub use class::{ClassCode, ClassCodes};
pub use feature::{Feature, FeatureCollection};
