//! OBJ file loader for mesh leaves
//!
//! Supports `v`, `vn` and `f` records (`f v`, `f v/t`, `f v//n`, `f v/t/n`).
//! Texture coordinates are skipped: `vt` records and the `t` slot of a face
//! corner are never read, since mesh leaves are flat colored. Faces are
//! fan-triangulated and expanded to a triangle list. When any face
//! corner lacks a normal the mesh is returned without normals and picks up
//! flat normals later.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use thiserror::Error;

use super::MeshData;
use crate::foundation::math::Vec3;

/// OBJ parse errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed number or index on a line
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// OBJ parser
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let file = File::open(path.as_ref())?;
        let mesh = Self::parse(BufReader::new(file))?;
        log::debug!(
            "Loaded {} triangles from {:?}",
            mesh.triangle_count(),
            path.as_ref()
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any reader
    pub fn parse<R: Read>(reader: BufReader<R>) -> Result<MeshData, ObjError> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();

        let mut out_positions = Vec::new();
        let mut out_normals = Vec::new();
        let mut all_have_normals = true;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => positions.push(parse_vec3(&mut parts, line_no, "vertex")?),
                Some("vn") => normals.push(parse_vec3(&mut parts, line_no, "normal")?),
                Some("f") => {
                    let mut corners = Vec::new();
                    for corner in parts {
                        corners.push(parse_corner(corner, line_no, &positions, &normals)?);
                    }
                    if corners.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_no,
                            message: "face needs at least three vertices".to_string(),
                        });
                    }

                    // Fan triangulation
                    for i in 1..corners.len() - 1 {
                        for (position, normal) in [corners[0], corners[i], corners[i + 1]] {
                            out_positions.push(position);
                            match normal {
                                Some(n) => out_normals.push(n),
                                None => all_have_normals = false,
                            }
                        }
                    }
                }
                _ => {
                    // Comments, texture coordinates, groups and materials are ignored
                }
            }
        }

        if out_positions.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ data".to_string()));
        }

        let mesh = MeshData::new(out_positions);
        Ok(if all_have_normals { mesh.with_normals(out_normals) } else { mesh })
    }
}

fn parse_vec3<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<Vec3, ObjError> {
    let mut next = |axis: &str| -> Result<f64, ObjError> {
        parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ObjError::ParseError {
                line,
                message: format!("Invalid {what} {axis}"),
            })
    };
    Ok(Vec3::new(next("x")?, next("y")?, next("z")?))
}

fn parse_corner(
    corner: &str,
    line: usize,
    positions: &[Vec3],
    normals: &[Vec3],
) -> Result<(Vec3, Option<Vec3>), ObjError> {
    let mut fields = corner.split('/');

    let position = fields
        .next()
        .and_then(|s| resolve_index(s, positions))
        .ok_or_else(|| ObjError::ParseError {
            line,
            message: format!("Invalid position index in '{corner}'"),
        })?;

    // Skip the texture slot
    let normal = match fields.nth(1) {
        Some(s) if !s.is_empty() => Some(resolve_index(s, normals).ok_or_else(|| ObjError::ParseError {
            line,
            message: format!("Invalid normal index in '{corner}'"),
        })?),
        _ => None,
    };

    Ok((position, normal))
}

/// OBJ indices are 1-based; negative values count back from the end
fn resolve_index(field: &str, items: &[Vec3]) -> Option<Vec3> {
    let index: i64 = field.parse().ok()?;
    let resolved = match index {
        0 => return None,
        i if i > 0 => usize::try_from(i - 1).ok()?,
        i => items.len().checked_sub(usize::try_from(-i).ok()?)?,
    };
    items.get(resolved).copied()
}
