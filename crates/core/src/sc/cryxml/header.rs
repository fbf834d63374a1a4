//! CryXmlB header and fixed record layouts.

use super::CryXmlError;

/// Seven signature bytes; the eighth header byte is reserved.
pub const SIGNATURE: &[u8; 7] = b"CryXmlB";
pub const HEADER_LEN: usize = 44;
pub const NODE_RECORD_LEN: usize = 28;
pub const ATTRIBUTE_RECORD_LEN: usize = 8;
pub const CHILD_INDEX_LEN: usize = 4;

/// Header fields following the 8-byte signature block. All offsets are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryXmlHeader {
    /// Declared document size; informational only.
    pub xml_size: u32,
    pub node_table_offset: u32,
    pub node_count: u32,
    pub attribute_table_offset: u32,
    pub attribute_count: u32,
    pub child_table_offset: u32,
    pub child_count: u32,
    pub string_data_offset: u32,
    pub string_data_size: u32,
}

impl CryXmlHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, CryXmlError> {
        if !buf.starts_with(SIGNATURE) {
            return Err(CryXmlError::NotCryXml);
        }
        if buf.len() < HEADER_LEN {
            return Err(CryXmlError::Truncated {
                needed: HEADER_LEN,
                actual: buf.len(),
            });
        }
        let field = |at: usize| {
            read_u32(buf, at).ok_or(CryXmlError::Truncated {
                needed: at + 4,
                actual: buf.len(),
            })
        };
        Ok(CryXmlHeader {
            xml_size: field(8)?,
            node_table_offset: field(12)?,
            node_count: field(16)?,
            attribute_table_offset: field(20)?,
            attribute_count: field(24)?,
            child_table_offset: field(28)?,
            child_count: field(32)?,
            string_data_offset: field(36)?,
            string_data_size: field(40)?,
        })
    }

    /// Every table (and the string pool) must lie entirely inside a buffer of `len` bytes.
    pub fn validate_tables(&self, len: usize) -> Result<(), CryXmlError> {
        check_table("node", self.node_table_offset, self.node_count, NODE_RECORD_LEN, len)?;
        check_table(
            "attribute",
            self.attribute_table_offset,
            self.attribute_count,
            ATTRIBUTE_RECORD_LEN,
            len,
        )?;
        check_table(
            "child index",
            self.child_table_offset,
            self.child_count,
            CHILD_INDEX_LEN,
            len,
        )?;
        check_table("string data", self.string_data_offset, self.string_data_size, 1, len)
    }
}

fn check_table(
    table: &'static str,
    offset: u32,
    count: u32,
    record_len: usize,
    len: usize,
) -> Result<(), CryXmlError> {
    let end = u64::from(offset) + u64::from(count) * record_len as u64;
    if end > len as u64 {
        return Err(CryXmlError::TableOutOfBounds {
            table,
            offset,
            count,
            len,
        });
    }
    Ok(())
}

/// One 28-byte node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub tag_offset: u32,
    pub content_offset: u32,
    pub attribute_count: u16,
    pub child_count: u16,
    /// Informational; reconstruction walks down from the root instead.
    pub parent_index: u32,
    pub first_attribute_index: u32,
    pub first_child_index: u32,
}

impl NodeRecord {
    pub fn read(buf: &[u8], at: usize) -> Option<Self> {
        Some(NodeRecord {
            tag_offset: read_u32(buf, at)?,
            content_offset: read_u32(buf, at + 4)?,
            attribute_count: read_u16(buf, at + 8)?,
            child_count: read_u16(buf, at + 10)?,
            parent_index: read_u32(buf, at + 12)?,
            first_attribute_index: read_u32(buf, at + 16)?,
            first_child_index: read_u32(buf, at + 20)?,
        })
    }
}

#[inline]
pub fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[inline]
pub fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}
