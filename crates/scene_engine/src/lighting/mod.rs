//! Illumination model shared by both rendering backends

mod phong;

pub use phong::{phong, phong_terms, PhongCoefficients, PhongTerms, SharedPhong};
