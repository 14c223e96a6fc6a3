//! Wavefront OBJ reader.
//!
//! Reads positions (`v`), normals (`vn`), texture coordinates (`vt`) and
//! triangular faces (`f`) with per-corner `v/vt/vn` indices. Indices are
//! 1-based; negative indices count back from the most recent attribute.
//! Grouping, smoothing, material and free-form statements are skipped.

use crate::util::{Error, Result, Vec2, Vec3};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// One corner of a face, as 0-based indices into [`ObjData`] attribute arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// Raw attribute streams and triangles of one OBJ source.
#[derive(Debug, Default)]
pub struct ObjData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub faces: Vec<[FaceVertex; 3]>,
}

impl ObjData {
    /// Number of face corners across all triangles.
    pub fn face_vertex_count(&self) -> usize {
        self.faces.len() * 3
    }
}

/// Index as written in the file plus its 0-based resolution.
#[derive(Clone, Copy)]
struct RawIndex {
    raw: i64,
    resolved: i64,
}

#[derive(Clone, Copy)]
struct RawCorner {
    position: RawIndex,
    texcoord: Option<RawIndex>,
    normal: Option<RawIndex>,
}

/// Parse an OBJ source. `path` is only used for diagnostics.
pub fn parse_obj<R: BufRead>(mut reader: R, path: &Path) -> Result<ObjData> {
    let mut data = ObjData::default();
    let mut raw_faces: Vec<[RawCorner; 3]> = Vec::new();

    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::parse(path, format!("line {}: {e}", line_no + 1)))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        // Comments may carry any encoding; only the statement part is decoded.
        let statement = match buf.iter().position(|&b| b == b'#') {
            Some(pos) => &buf[..pos],
            None => &buf[..],
        };
        let content = String::from_utf8_lossy(statement);
        let mut tokens = content.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, 3, path, line_no)?;
                data.positions.push(Vec3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, 3, path, line_no)?;
                data.normals.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut tokens, 1, path, line_no)?;
                data.texcoords.push(Vec2::new(u, v));
            }
            "f" => {
                let corners: Vec<&str> = tokens.collect();
                if corners.len() != 3 {
                    return Err(Error::NonTriangularFace {
                        path: path.to_path_buf(),
                        arity: corners.len(),
                    });
                }
                let mut face = [RawCorner {
                    position: RawIndex { raw: 0, resolved: 0 },
                    texcoord: None,
                    normal: None,
                }; 3];
                for (slot, corner) in face.iter_mut().zip(&corners) {
                    *slot = parse_corner(corner, &data, path, line_no)?;
                }
                raw_faces.push(face);
            }
            // Statements that carry no geometry for us.
            _ => {}
        }
    }

    data.faces.reserve(raw_faces.len());
    for face in raw_faces {
        let mut resolved = [FaceVertex {
            position: 0,
            texcoord: None,
            normal: None,
        }; 3];
        for (out, corner) in resolved.iter_mut().zip(face) {
            *out = FaceVertex {
                position: check_range(corner.position, data.positions.len(), "position", path)?,
                texcoord: corner
                    .texcoord
                    .map(|i| check_range(i, data.texcoords.len(), "texcoord", path))
                    .transpose()?,
                normal: corner
                    .normal
                    .map(|i| check_range(i, data.normals.len(), "normal", path))
                    .transpose()?,
            };
        }
        data.faces.push(resolved);
    }

    Ok(data)
}

/// Read up to `N` floats, requiring at least `required`; missing ones are 0.
fn parse_floats<'a, const N: usize>(
    tokens: &mut impl Iterator<Item = &'a str>,
    required: usize,
    path: &Path,
    line_no: usize,
) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for (slot, tok) in out.iter_mut().zip(tokens) {
        let value: f32 = tok.parse().map_err(|_| {
            Error::parse(path, format!("line {line_no}: invalid number '{tok}'"))
        })?;
        if !value.is_finite() {
            return Err(Error::parse(
                path,
                format!("line {line_no}: non-finite number '{tok}'"),
            ));
        }
        *slot = value;
        count += 1;
    }
    if count < required {
        return Err(Error::parse(
            path,
            format!("line {line_no}: expected {required} components, found {count}"),
        ));
    }
    Ok(out)
}

fn parse_corner(corner: &str, data: &ObjData, path: &Path, line_no: usize) -> Result<RawCorner> {
    let mut parts = corner.split('/');
    let position = match parts.next() {
        Some(p) if !p.is_empty() => parse_index(p, data.positions.len(), path, line_no)?,
        _ => {
            return Err(Error::parse(
                path,
                format!("line {line_no}: face corner '{corner}' has no position index"),
            ))
        }
    };
    let texcoord = match parts.next() {
        Some(t) if !t.is_empty() => Some(parse_index(t, data.texcoords.len(), path, line_no)?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(n) if !n.is_empty() => Some(parse_index(n, data.normals.len(), path, line_no)?),
        _ => None,
    };
    if parts.next().is_some() {
        return Err(Error::parse(
            path,
            format!("line {line_no}: malformed face corner '{corner}'"),
        ));
    }
    Ok(RawCorner {
        position,
        texcoord,
        normal,
    })
}

fn parse_index(tok: &str, defined: usize, path: &Path, line_no: usize) -> Result<RawIndex> {
    let raw: i64 = tok
        .parse()
        .map_err(|_| Error::parse(path, format!("line {line_no}: invalid index '{tok}'")))?;
    let resolved = match raw {
        0 => {
            return Err(Error::parse(
                path,
                format!("line {line_no}: index 0 is not valid in OBJ"),
            ))
        }
        r if r > 0 => r - 1,
        r => defined as i64 + r,
    };
    Ok(RawIndex { raw, resolved })
}

fn check_range(idx: RawIndex, len: usize, kind: &'static str, path: &Path) -> Result<usize> {
    if idx.resolved < 0 || idx.resolved >= len as i64 {
        return Err(Error::IndexOutOfRange {
            path: PathBuf::from(path),
            kind,
            index: idx.raw,
            len,
        });
    }
    Ok(idx.resolved as usize)
}
