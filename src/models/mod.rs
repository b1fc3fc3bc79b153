//! Curve family implementations.
//!
//! Models are implemented as small, pure functions so that fitting, scoring and
//! plotting code can stay generic over `Family`.

pub mod model;

pub use model::*;
