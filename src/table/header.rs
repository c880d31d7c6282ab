//! Table header persistence.
//!
//! The `<table>.thead` file mirrors the catalog's view of one table: its
//! name, the next `__rowid__` to assign, the declared columns in
//! declaration order, and the set of indexed column ids.

use bytes::{Buf, BufMut, BytesMut};

use crate::catalog::MAX_NAME_LEN;
use crate::datum::{Type, Value};

use super::error::TableError;

const HEADER_MAGIC: u32 = 0x5348_5448; // "SHTH"

const FLAG_NOT_NULL: u8 = 1 << 0;
const FLAG_UNIQUE: u8 = 1 << 1;
const FLAG_PRIMARY_KEY: u8 = 1 << 2;

/// A declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name, unique within the table.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// UNIQUE constraint.
    pub unique: bool,
    /// PRIMARY KEY constraint (implies NOT NULL and UNIQUE).
    pub primary_key: bool,
    /// DEFAULT value, already coerced to the column type.
    pub default: Option<Value>,
}

impl ColumnMeta {
    /// Returns true when NULL is rejected for this column.
    pub fn rejects_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    /// Returns true when duplicate values are rejected for this column.
    pub fn rejects_duplicates(&self) -> bool {
        self.unique || self.primary_key
    }
}

/// The persistent table descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    /// Table name (embedded copy; the catalog holds the authoritative one).
    pub name: String,
    /// Next `__rowid__` value to assign.
    pub next_rowid: i64,
    /// Declared columns in declaration order.
    pub columns: Vec<ColumnMeta>,
    /// Ids of indexed columns, ascending.
    pub indexed: Vec<usize>,
}

impl TableHeader {
    /// Encodes the header into its on-disk form.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Serialization` if a default value fails to encode.
    pub fn encode(&self) -> Result<Vec<u8>, TableError> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(HEADER_MAGIC);
        put_name(&mut buf, &self.name)?;
        buf.put_i64_le(self.next_rowid);

        buf.put_u16_le(self.columns.len() as u16);
        for col in &self.columns {
            put_name(&mut buf, &col.name)?;
            buf.put_u8(col.ty.tag());
            buf.put_u16_le(col.ty.capacity().unwrap_or(0));
            let mut flags = 0u8;
            if col.not_null {
                flags |= FLAG_NOT_NULL;
            }
            if col.unique {
                flags |= FLAG_UNIQUE;
            }
            if col.primary_key {
                flags |= FLAG_PRIMARY_KEY;
            }
            buf.put_u8(flags);
            match &col.default {
                Some(value) if !value.is_null() => {
                    buf.put_u8(1);
                    let mut value_buf = vec![0u8; value.serialized_size()];
                    value.serialize(&mut value_buf)?;
                    buf.put_u16_le(value_buf.len() as u16);
                    buf.put_slice(&value_buf);
                }
                _ => buf.put_u8(0),
            }
        }

        buf.put_u16_le(self.indexed.len() as u16);
        for &id in &self.indexed {
            buf.put_u16_le(id as u16);
        }

        Ok(buf.to_vec())
    }

    /// Decodes a header from its on-disk form.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Corrupted` for malformed input.
    pub fn decode(data: &[u8]) -> Result<Self, TableError> {
        let mut buf = data;

        if buf.remaining() < 4 {
            return Err(TableError::Corrupted("truncated header".to_string()));
        }
        let magic = buf.get_u32_le();
        if magic != HEADER_MAGIC {
            return Err(TableError::Corrupted(format!("bad magic {:#x}", magic)));
        }

        let name = get_name(&mut buf)?;
        if buf.remaining() < 10 {
            return Err(TableError::Corrupted("truncated header".to_string()));
        }
        let next_rowid = buf.get_i64_le();

        let column_count = buf.get_u16_le() as usize;
        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let col_name = get_name(&mut buf)?;
            if buf.remaining() < 5 {
                return Err(TableError::Corrupted("truncated column".to_string()));
            }
            let tag = buf.get_u8();
            let capacity = buf.get_u16_le();
            let ty = Type::from_tag(tag, capacity)
                .ok_or_else(|| TableError::Corrupted(format!("unknown type tag {}", tag)))?;
            let flags = buf.get_u8();
            let has_default = buf.get_u8() != 0;
            let default = if has_default {
                if buf.remaining() < 2 {
                    return Err(TableError::Corrupted("truncated default".to_string()));
                }
                let len = buf.get_u16_le() as usize;
                if buf.remaining() < len {
                    return Err(TableError::Corrupted("truncated default".to_string()));
                }
                let (value, _) = Value::deserialize(&buf[..len], ty)?;
                buf.advance(len);
                Some(value)
            } else {
                None
            };
            columns.push(ColumnMeta {
                name: col_name,
                ty,
                not_null: flags & FLAG_NOT_NULL != 0,
                unique: flags & FLAG_UNIQUE != 0,
                primary_key: flags & FLAG_PRIMARY_KEY != 0,
                default,
            });
        }

        if buf.remaining() < 2 {
            return Err(TableError::Corrupted("truncated index list".to_string()));
        }
        let indexed_count = buf.get_u16_le() as usize;
        let mut indexed = Vec::with_capacity(indexed_count);
        for _ in 0..indexed_count {
            if buf.remaining() < 2 {
                return Err(TableError::Corrupted("truncated index list".to_string()));
            }
            let id = buf.get_u16_le() as usize;
            if id >= columns.len() {
                return Err(TableError::Corrupted(format!(
                    "indexed column id {} out of range",
                    id
                )));
            }
            indexed.push(id);
        }

        Ok(Self {
            name,
            next_rowid,
            columns,
            indexed,
        })
    }
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<(), TableError> {
    if name.len() > MAX_NAME_LEN {
        return Err(TableError::NameTooLong {
            name: name.to_string(),
        });
    }
    buf.put_u16_le(name.len() as u16);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn get_name(buf: &mut &[u8]) -> Result<String, TableError> {
    if buf.remaining() < 2 {
        return Err(TableError::Corrupted("truncated name".to_string()));
    }
    let len = buf.get_u16_le() as usize;
    if len > MAX_NAME_LEN || buf.remaining() < len {
        return Err(TableError::Corrupted("invalid name length".to_string()));
    }
    let name = String::from_utf8(buf[..len].to_vec())
        .map_err(|e| TableError::Corrupted(e.to_string()))?;
    buf.advance(len);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> TableHeader {
        TableHeader {
            name: "people".to_string(),
            next_rowid: 17,
            columns: vec![
                ColumnMeta {
                    name: "id".to_string(),
                    ty: Type::Int,
                    not_null: false,
                    unique: false,
                    primary_key: true,
                    default: None,
                },
                ColumnMeta {
                    name: "name".to_string(),
                    ty: Type::Varchar(32),
                    not_null: true,
                    unique: false,
                    primary_key: false,
                    default: Some(Value::Str("unknown".to_string())),
                },
                ColumnMeta {
                    name: "score".to_string(),
                    ty: Type::Float,
                    not_null: false,
                    unique: true,
                    primary_key: false,
                    default: None,
                },
            ],
            indexed: vec![0],
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let header = sample_header();
        let encoded = header.encode().unwrap();
        let decoded = TableHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut encoded = sample_header().encode().unwrap();
        encoded[0] ^= 0xFF;
        assert!(matches!(
            TableHeader::decode(&encoded),
            Err(TableError::Corrupted(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let encoded = sample_header().encode().unwrap();
        for cut in [0, 3, 8, encoded.len() - 1] {
            assert!(TableHeader::decode(&encoded[..cut]).is_err());
        }
    }

    #[test]
    fn test_name_length_bound() {
        let mut header = sample_header();
        header.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            header.encode(),
            Err(TableError::NameTooLong { .. })
        ));
    }
}
