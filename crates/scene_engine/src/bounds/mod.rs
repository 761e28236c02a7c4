//! Bounding volumes for picking

mod ritter;

pub use ritter::{fit_ritter, BoundingSphere, RitterFit, RITTER_EPSILON, RITTER_MAX_ITERATIONS};
