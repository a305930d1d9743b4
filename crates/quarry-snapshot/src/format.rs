//! Snapshot file format
//!
//! ```text
//! +-------+---------+-------------+-------+-----------------+
//! | magic | version | payload len | crc32 | bincode payload |
//! | 4 B   | u16 LE  | u64 LE      | u32 LE| len bytes       |
//! +-------+---------+-------------+-------+-----------------+
//! ```
//!
//! The payload is a [`StoreImage`]: the schema definitions, every class
//! table's keys and columns, and the store's key counter.

use bincode::Options;
use quarry_core::{ClassDef, Error, ObjectKey, Result, Schema};
use quarry_storage::{Column, Store, StoreConfig};
use serde::{Deserialize, Serialize};

/// Snapshot magic: "QRYS" (QuaRrY Snapshot)
pub const MAGIC: [u8; 4] = *b"QRYS";

/// Snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_LEN: usize = 4 + 2 + 8 + 4;

/// Version compatibility information
#[derive(Debug, Clone, Copy)]
pub struct FormatVersion {
    /// Current version of this format
    pub current: u16,
    /// Minimum supported version for reading
    pub min_read: u16,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u16) -> bool {
        version >= self.min_read && version <= self.current
    }
}

/// Snapshot format version info
pub fn snapshot_version() -> FormatVersion {
    FormatVersion {
        current: SNAPSHOT_FORMAT_VERSION,
        min_read: 1,
    }
}

/// Decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version the file was written with
    pub version: u16,
    /// Payload length in bytes
    pub payload_len: u64,
    /// CRC32 of the payload
    pub checksum: u32,
}

impl Header {
    /// Encodes the header
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6..14].copy_from_slice(&self.payload_len.to_le_bytes());
        out[14..18].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }

    /// Decodes and validates a header
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Corruption(format!(
                "snapshot is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        if bytes[0..4] != MAGIC {
            return Err(Error::Corruption("bad snapshot magic".into()));
        }

        let mut version = [0u8; 2];
        version.copy_from_slice(&bytes[4..6]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[6..14]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[14..18]);

        let header = Header {
            version: u16::from_le_bytes(version),
            payload_len: u64::from_le_bytes(len),
            checksum: u32::from_le_bytes(crc),
        };

        if !snapshot_version().can_read(header.version) {
            return Err(Error::Corruption(format!(
                "unsupported snapshot version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// One class table as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableImage {
    /// Live keys in storage order
    pub keys: Vec<ObjectKey>,
    /// Columns in field-table order
    pub columns: Vec<Column>,
}

/// Whole store as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreImage {
    /// Class definitions the schema is rebuilt from
    pub definitions: Vec<ClassDef>,
    /// Next key the store will hand out
    pub next_key: u64,
    /// Tables in class-id order
    pub tables: Vec<TableImage>,
}

impl StoreImage {
    /// Captures a store
    pub fn capture(store: &Store) -> Self {
        use quarry_core::ObjectSource;

        Self {
            definitions: store.schema().definitions().to_vec(),
            next_key: store.next_key(),
            tables: store
                .tables()
                .iter()
                .map(|table| TableImage {
                    keys: table.keys().to_vec(),
                    columns: table.columns().to_vec(),
                })
                .collect(),
        }
    }

    /// Rebuilds a store, validating the image against its own schema
    pub fn restore(self, config: StoreConfig) -> Result<Store> {
        let schema = Schema::from_definitions(self.definitions)
            .map_err(|e| Error::Corruption(format!("stored schema is invalid: {}", e)))?;
        let tables = self
            .tables
            .into_iter()
            .map(|table| (table.keys, table.columns))
            .collect();
        Store::from_parts(schema, tables, self.next_key, config)
    }

    /// Number of objects across all classes
    pub fn object_count(&self) -> usize {
        self.tables.iter().map(|t| t.keys.len()).sum()
    }
}

fn codec(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(limit)
}

/// Serializes an image into a complete snapshot file
pub fn encode(image: &StoreImage) -> Result<Vec<u8>> {
    let payload = codec(u64::MAX)
        .serialize(image)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let header = Header {
        version: SNAPSHOT_FORMAT_VERSION,
        payload_len: payload.len() as u64,
        checksum: crc32fast::hash(&payload),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parses a snapshot file. Never panics on malformed input.
pub fn decode(bytes: &[u8], verify_checksum: bool) -> Result<(Header, StoreImage)> {
    let header = Header::parse(bytes)?;
    let payload = &bytes[HEADER_LEN..];

    if payload.len() as u64 != header.payload_len {
        return Err(Error::Corruption(format!(
            "snapshot payload is {} bytes, header says {}",
            payload.len(),
            header.payload_len
        )));
    }

    if verify_checksum {
        let actual = crc32fast::hash(payload);
        if actual != header.checksum {
            return Err(Error::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                header.checksum, actual
            )));
        }
    }

    let image = codec(header.payload_len)
        .deserialize(payload)
        .map_err(|e| Error::Corruption(format!("snapshot payload: {}", e)))?;
    Ok((header, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::{FieldType, Value};

    fn store() -> Store {
        let schema = Schema::from_definitions(vec![ClassDef::new("Row")
            .field("n", FieldType::Integer)
            .field("s", FieldType::String)])
        .unwrap();
        let mut store = Store::new(schema);
        store
            .insert("Row", vec![("n", Value::from(7)), ("s", Value::from("seven"))])
            .unwrap();
        store
    }

    #[test]
    fn test_version_compatibility() {
        let v = snapshot_version();
        assert!(v.can_read(1));
        assert!(!v.can_read(0));
        assert!(!v.can_read(999));
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&StoreImage::capture(&store())).unwrap();
        assert_eq!(&bytes[0..4], b"QRYS");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), SNAPSHOT_FORMAT_VERSION);

        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.payload_len as usize, bytes.len() - HEADER_LEN);
    }

    #[test]
    fn test_decode_rejects_damage() {
        let bytes = encode(&StoreImage::capture(&store())).unwrap();

        // Flipped payload byte
        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xFF;
        assert!(matches!(decode(&flipped, true), Err(Error::Corruption(_))));

        // Truncated
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1], true),
            Err(Error::Corruption(_))
        ));
        assert!(matches!(decode(&bytes[..3], true), Err(Error::Corruption(_))));

        // Unknown version
        let mut future = bytes.clone();
        future[4..6].copy_from_slice(&99u16.to_le_bytes());
        assert!(matches!(decode(&future, true), Err(Error::Corruption(_))));

        // Bad magic
        let mut magic = bytes;
        magic[0] = b'X';
        assert!(matches!(decode(&magic, true), Err(Error::Corruption(_))));
    }
}
