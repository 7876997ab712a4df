//! Typed field values.
//!
//! A [`Field`] is the atomic unit of data in a record: a 32-bit integer, a
//! 32-bit float, or a text value. Records carry no schema, so every field
//! is self-describing.

use std::fmt;

use super::error::HeapError;

/// Discriminant of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int32,
    Float32,
    Text,
}

/// On-disk type tags. Part of the file format; do not renumber.
const TAG_INT32: u32 = 0;
const TAG_FLOAT32: u32 = 1;
const TAG_TEXT: u32 = 2;

/// A single typed value in a record.
///
/// Equality and ordering are defined only within one kind; the executor
/// treats cross-kind comparisons as false (with a one-shot diagnostic)
/// rather than as errors. Text compares lexicographically on bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit floating point.
    Float32(f32),
    /// UTF-8 text. The on-disk format is whitespace-delimited, so text
    /// values must not contain whitespace (documented format limitation).
    Text(String),
}

impl Field {
    /// Returns the kind of this field.
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Int32(_) => FieldKind::Int32,
            Field::Float32(_) => FieldKind::Float32,
            Field::Text(_) => FieldKind::Text,
        }
    }

    /// Appends the on-disk text form, `"<tag> <len> <value> "`.
    ///
    /// The length is 4 for numeric kinds and `bytes + 1` for text (the
    /// original format counted a terminator byte); it is parsed and
    /// ignored on read, but kept for file compatibility.
    pub fn serialize_into(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Field::Int32(v) => write!(out, "{} 4 {} ", TAG_INT32, v),
            Field::Float32(v) => write!(out, "{} 4 {} ", TAG_FLOAT32, v),
            Field::Text(s) => {
                debug_assert!(
                    !s.contains(char::is_whitespace),
                    "text fields cannot contain whitespace"
                );
                write!(out, "{} {} {} ", TAG_TEXT, s.len() + 1, s)
            }
        }
        .expect("writing to a String cannot fail");
    }

    /// Parses one field from a whitespace-token stream.
    pub(crate) fn parse<'a>(
        tokens: &mut impl Iterator<Item = &'a str>,
    ) -> Result<Self, HeapError> {
        let tag: u32 = next_token(tokens)?
            .parse()
            .map_err(|_| HeapError::InvalidRecord("bad field tag".into()))?;
        // Stored length; the value token determines the actual size.
        let _len: usize = next_token(tokens)?
            .parse()
            .map_err(|_| HeapError::InvalidRecord("bad field length".into()))?;
        let value = next_token(tokens)?;

        match tag {
            TAG_INT32 => value
                .parse()
                .map(Field::Int32)
                .map_err(|_| HeapError::InvalidRecord(format!("bad int value {:?}", value))),
            TAG_FLOAT32 => value
                .parse()
                .map(Field::Float32)
                .map_err(|_| HeapError::InvalidRecord(format!("bad float value {:?}", value))),
            TAG_TEXT => Ok(Field::Text(value.to_string())),
            other => Err(HeapError::InvalidRecord(format!(
                "unknown field tag {}",
                other
            ))),
        }
    }

    /// Appends a deterministic structural encoding of this field.
    ///
    /// Fingerprints are injective: equal byte strings imply equal fields,
    /// and concatenated fingerprints cannot collide across different
    /// splits (numeric kinds are fixed-width, text is length-prefixed).
    /// Used as the hash key for joins and group-by.
    ///
    /// Floats are encoded by bit pattern, so `NaN` matches `NaN` and
    /// `-0.0` does not match `0.0`.
    pub fn fingerprint(&self, out: &mut Vec<u8>) {
        match self {
            Field::Int32(v) => {
                out.push(TAG_INT32 as u8);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Field::Float32(v) => {
                out.push(TAG_FLOAT32 as u8);
                out.extend_from_slice(&v.to_bits().to_le_bytes());
            }
            Field::Text(s) => {
                out.push(TAG_TEXT as u8);
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Same-kind ordering, used by MIN/MAX accumulators.
    ///
    /// Returns `None` when the kinds differ or a float comparison is
    /// unordered (NaN).
    pub fn same_kind_cmp(&self, other: &Field) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Field::Int32(a), Field::Int32(b)) => Some(a.cmp(b)),
            (Field::Float32(a), Field::Float32(b)) => a.partial_cmp(b),
            (Field::Text(a), Field::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Adds `other` into this accumulator when both are the same numeric
    /// kind. Returns false, leaving the accumulator unchanged, for text
    /// operands or mismatched kinds.
    pub fn accumulate_sum(&mut self, other: &Field) -> bool {
        match (self, other) {
            (Field::Int32(acc), Field::Int32(v)) => {
                *acc = acc.wrapping_add(*v);
                true
            }
            (Field::Float32(acc), Field::Float32(v)) => {
                *acc += v;
                true
            }
            _ => false,
        }
    }
}

/// Renders the value alone: decimal integers, shortest-roundtrip floats,
/// text verbatim. This is the form Print emits and the relation-tag
/// comparison uses.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int32(v) => write!(f, "{}", v),
            Field::Float32(v) => write!(f, "{}", v),
            Field::Text(s) => write!(f, "{}", s),
        }
    }
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<&'a str, HeapError> {
    tokens
        .next()
        .ok_or_else(|| HeapError::InvalidRecord("unexpected end of record".into()))
}
