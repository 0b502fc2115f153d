//! Reader for NumPy `.npy` files holding a 2-D float matrix.
//!
//! Layout: `\x93NUMPY`, major and minor version bytes, a little-endian header length
//! (`u16` for v1, `u32` for v2/v3), an ASCII Python dict literal describing `descr`,
//! `fortran_order` and `shape`, then the raw array bytes.

use crate::domain::DomainError;

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Float {
    F32,
    F64,
}

impl Float {
    fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    endian: Endian,
    dtype: Float,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// A decoded matrix: `rows × cols` values, row-major, widened or narrowed to `f32`.
#[derive(Debug, Clone)]
pub struct NpyMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

pub fn parse(bytes: &[u8]) -> Result<NpyMatrix, DomainError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(DomainError::load("not an .npy file (bad magic)"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(DomainError::load("truncated .npy header"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => return Err(DomainError::load(format!("unsupported .npy version {v}"))),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(DomainError::load("truncated .npy header"));
    }
    let header_text = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| DomainError::load(".npy header is not valid UTF-8"))?;
    let header = parse_header(header_text)?;

    if header.fortran_order {
        return Err(DomainError::load(
            "Fortran-ordered .npy matrices are not supported; save with C order",
        ));
    }
    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        shape => {
            return Err(DomainError::load(format!(
                "expected a 2-D matrix, got shape {shape:?}"
            )))
        }
    };

    let count = rows
        .checked_mul(cols)
        .ok_or_else(|| DomainError::load("matrix shape overflows"))?;
    let payload = &bytes[data_start..];
    let expected = count
        .checked_mul(header.dtype.size())
        .ok_or_else(|| DomainError::load("matrix payload size overflows"))?;
    if payload.len() != expected {
        return Err(DomainError::load(format!(
            "matrix payload is {} bytes, shape ({rows}, {cols}) needs {expected}",
            payload.len()
        )));
    }

    let data = match header.dtype {
        Float::F32 => payload
            .chunks_exact(4)
            .map(|c| {
                let b = [c[0], c[1], c[2], c[3]];
                match header.endian {
                    Endian::Little => f32::from_le_bytes(b),
                    Endian::Big => f32::from_be_bytes(b),
                }
            })
            .collect(),
        Float::F64 => payload
            .chunks_exact(8)
            .map(|c| {
                let b = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
                let v = match header.endian {
                    Endian::Little => f64::from_le_bytes(b),
                    Endian::Big => f64::from_be_bytes(b),
                };
                v as f32
            })
            .collect(),
    };

    Ok(NpyMatrix { rows, cols, data })
}

fn parse_header(text: &str) -> Result<Header, DomainError> {
    let descr = dict_value(text, "descr")?;
    let descr = descr.trim().trim_matches(|c| c == '\'' || c == '"');
    let (endian, dtype) = match descr {
        "<f4" | "|f4" | "=f4" => (Endian::Little, Float::F32),
        "<f8" | "|f8" | "=f8" => (Endian::Little, Float::F64),
        ">f4" => (Endian::Big, Float::F32),
        ">f8" => (Endian::Big, Float::F64),
        other => {
            return Err(DomainError::load(format!(
                "unsupported .npy dtype {other}; expected float32 or float64"
            )))
        }
    };

    let fortran_order = match dict_value(text, "fortran_order")?.trim() {
        "True" => true,
        "False" => false,
        other => {
            return Err(DomainError::load(format!(
                "invalid fortran_order value {other}"
            )))
        }
    };

    let shape_text = dict_value(text, "shape")?.trim();
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| DomainError::load(format!("invalid shape {shape_text}")))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| DomainError::load(format!("invalid shape dimension {s}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        endian,
        dtype,
        fortran_order,
        shape,
    })
}

/// Raw text of the value for `key` in the header dict, up to the next top-level comma.
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str, DomainError> {
    let needle_single = format!("'{key}'");
    let needle_double = format!("\"{key}\"");
    let start = text
        .find(&needle_single)
        .map(|i| i + needle_single.len())
        .or_else(|| text.find(&needle_double).map(|i| i + needle_double.len()))
        .ok_or_else(|| DomainError::load(format!(".npy header lacks '{key}'")))?;

    let rest = text[start..]
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| DomainError::load(format!("malformed .npy header near '{key}'")))?;

    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' | '}' if depth == 0 => return Ok(&rest[..i]),
            _ => {}
        }
    }
    Ok(rest)
}
