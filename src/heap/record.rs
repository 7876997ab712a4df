//! Records: ordered sequences of fields.

use super::error::HeapError;
use super::field::Field;

/// A record (row): an ordered sequence of [`Field`]s with no schema.
///
/// # Serialization
///
/// Records are stored as whitespace-delimited text,
/// `"<field_count> <field>*"`, where each field contributes
/// `"<tag> <len> <value> "`. The format is fixed for on-disk
/// compatibility; it is why text fields cannot contain whitespace.
///
/// # Relation tags
///
/// By convention, multi-relation storage appends the relation name as a
/// final `Text` field of every record. This stands in for a catalog; the
/// scan operator filters on it and strips it from its output.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The fields, in order.
    pub fields: Vec<Field>,
}

impl Record {
    /// Creates a record from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializes to the on-disk text form.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.fields.len().to_string());
        out.push(' ');
        for field in &self.fields {
            field.serialize_into(&mut out);
        }
        out
    }

    /// Parses a record from its on-disk text form.
    ///
    /// Trailing bytes after the last field are ignored: a reused page slot
    /// keeps its old, possibly longer length, so the stored region may end
    /// with remnants of a previous record.
    pub fn deserialize(text: &str) -> Result<Self, HeapError> {
        let mut tokens = text.split_ascii_whitespace();
        let count: usize = tokens
            .next()
            .ok_or_else(|| HeapError::InvalidRecord("empty record text".into()))?
            .parse()
            .map_err(|_| HeapError::InvalidRecord("bad field count".into()))?;

        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            fields.push(Field::parse(&mut tokens)?);
        }
        Ok(Record { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let record = Record::new(vec![
            Field::Int32(24002),
            Field::Text("Xenokrates".into()),
            Field::Int32(24),
        ]);
        let text = record.serialize();
        assert_eq!(Record::deserialize(&text).unwrap(), record);
    }

    #[test]
    fn test_serialized_form() {
        let record = Record::new(vec![Field::Int32(1), Field::Text("A".into())]);
        assert_eq!(record.serialize(), "2 0 4 1 2 2 A ");
    }

    #[test]
    fn test_empty_record() {
        let record = Record::new(vec![]);
        assert_eq!(record.serialize(), "0 ");
        assert_eq!(Record::deserialize("0 ").unwrap(), record);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        // A short record written over a longer one leaves stale text
        // behind; parsing must stop after the declared field count.
        let record = Record::new(vec![Field::Int32(7)]);
        let mut text = record.serialize();
        text.push_str("2 4 999 leftover ");
        assert_eq!(Record::deserialize(&text).unwrap(), record);
    }

    #[test]
    fn test_truncated_record_fails() {
        assert!(matches!(
            Record::deserialize("2 0 4 1 "),
            Err(HeapError::InvalidRecord(_))
        ));
        assert!(matches!(
            Record::deserialize(""),
            Err(HeapError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_relation_tag_convention() {
        let record = Record::new(vec![
            Field::Int32(1),
            Field::Float32(1.0),
            Field::Text("DURABLE".into()),
        ]);
        let parsed = Record::deserialize(&record.serialize()).unwrap();
        assert_eq!(parsed.fields.last(), Some(&Field::Text("DURABLE".into())));
    }
}
