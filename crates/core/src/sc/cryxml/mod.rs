//! CryXmlB decoder: flat node/attribute/child-index/string tables → owned XML tree → text.
//!
//! The input is untrusted. Every offset and count is checked before use, and all failures
//! come back as a [`CryXmlError`]; no input can make the decoder panic or allocate beyond
//! what the buffer itself bounds.

mod header;
mod node;

pub use header::{CryXmlHeader, HEADER_LEN, NodeRecord, SIGNATURE};
pub use node::XmlNode;

use header::{ATTRIBUTE_RECORD_LEN, CHILD_INDEX_LEN, NODE_RECORD_LEN, read_u32};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryXmlError {
    #[error("not a binary-XML document (missing CryXmlB signature)")]
    NotCryXml,
    #[error("truncated header: need {needed} bytes, buffer has {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("{table} table out of bounds: offset {offset} with {count} records exceeds buffer of {len} bytes")]
    TableOutOfBounds {
        table: &'static str,
        offset: u32,
        count: u32,
        len: usize,
    },
    #[error("document contains no nodes")]
    EmptyDocument,
    #[error("invalid attribute index {index} on node {node} (attribute table holds {count})")]
    InvalidAttributeIndex { node: u32, index: u64, count: u32 },
    #[error("invalid child index {index} on node {node} (child table holds {count})")]
    InvalidChildIndex { node: u32, index: u64, count: u32 },
    #[error("invalid node index {index} (node table holds {count})")]
    InvalidNodeIndex { index: u32, count: u32 },
    #[error("node {index} is referenced more than once")]
    NodeRevisited { index: u32 },
    #[error("string offset {offset} outside string pool of {size} bytes")]
    StringOffsetOutOfRange { offset: u32, size: u32 },
}

/// Cheap signature check.
#[inline]
pub fn is_cry_xml(buf: &[u8]) -> bool {
    buf.starts_with(SIGNATURE)
}

/// Decode a CryXmlB buffer into an owned tree rooted at node 0.
pub fn decode(buf: &[u8]) -> Result<XmlNode, CryXmlError> {
    let header = CryXmlHeader::parse(buf)?;
    header.validate_tables(buf.len())?;
    if header.node_count == 0 {
        return Err(CryXmlError::EmptyDocument);
    }
    Tables { buf, header }.materialize()
}

/// Decode straight to XML text.
pub fn decode_to_string(buf: &[u8]) -> Result<String, CryXmlError> {
    decode(buf).map(|root| root.to_xml_string())
}

/// Validated view over the four tables.
struct Tables<'a> {
    buf: &'a [u8],
    header: CryXmlHeader,
}

/// A node whose children are still being materialized.
struct Frame {
    node: XmlNode,
    children: Vec<u32>,
    next: usize,
}

impl Tables<'_> {
    /// Depth-first from the root with an explicit stack. Each node may be reached once;
    /// that bounds the work by the node count and rejects cyclic child tables.
    fn materialize(&self) -> Result<XmlNode, CryXmlError> {
        let mut visited = vec![false; self.header.node_count as usize];
        let mut stack = vec![self.open(0, &mut visited)?];

        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = frame.children.get(frame.next) {
                frame.next += 1;
                let child_frame = self.open(child, &mut visited)?;
                stack.push(child_frame);
                continue;
            }
            let Some(done) = stack.pop() else { break };
            match stack.last_mut() {
                Some(parent) => parent.node.children.push(done.node),
                None => return Ok(done.node),
            }
        }
        Err(CryXmlError::EmptyDocument)
    }

    /// Resolve one node's strings, attributes and child indices.
    fn open(&self, index: u32, visited: &mut [bool]) -> Result<Frame, CryXmlError> {
        let h = &self.header;
        let slot = visited
            .get_mut(index as usize)
            .ok_or(CryXmlError::InvalidNodeIndex {
                index,
                count: h.node_count,
            })?;
        if *slot {
            return Err(CryXmlError::NodeRevisited { index });
        }
        *slot = true;

        let at = h.node_table_offset as usize + index as usize * NODE_RECORD_LEN;
        let record = NodeRecord::read(self.buf, at).ok_or(CryXmlError::TableOutOfBounds {
            table: "node",
            offset: h.node_table_offset,
            count: h.node_count,
            len: self.buf.len(),
        })?;

        let mut node = XmlNode {
            tag: self.string(record.tag_offset)?,
            content: self.string(record.content_offset)?,
            attributes: Vec::with_capacity(record.attribute_count as usize),
            children: Vec::with_capacity(record.child_count as usize),
        };

        let first_attr = u64::from(record.first_attribute_index);
        for i in first_attr..first_attr + u64::from(record.attribute_count) {
            if i >= u64::from(h.attribute_count) {
                return Err(CryXmlError::InvalidAttributeIndex {
                    node: index,
                    index: i,
                    count: h.attribute_count,
                });
            }
            let at = h.attribute_table_offset as usize + i as usize * ATTRIBUTE_RECORD_LEN;
            let (key, value) = read_u32(self.buf, at)
                .zip(read_u32(self.buf, at + 4))
                .ok_or(CryXmlError::InvalidAttributeIndex {
                    node: index,
                    index: i,
                    count: h.attribute_count,
                })?;
            node.attributes.push((self.string(key)?, self.string(value)?));
        }

        let first_child = u64::from(record.first_child_index);
        let mut children = Vec::with_capacity(record.child_count as usize);
        for j in first_child..first_child + u64::from(record.child_count) {
            let invalid = CryXmlError::InvalidChildIndex {
                node: index,
                index: j,
                count: h.child_count,
            };
            if j >= u64::from(h.child_count) {
                return Err(invalid);
            }
            let at = h.child_table_offset as usize + j as usize * CHILD_INDEX_LEN;
            children.push(read_u32(self.buf, at).ok_or(invalid)?);
        }

        Ok(Frame {
            node,
            children,
            next: 0,
        })
    }

    /// NUL-terminated string at `offset` inside the pool (runs to the pool end if unterminated).
    fn string(&self, offset: u32) -> Result<String, CryXmlError> {
        let h = &self.header;
        let out_of_range = CryXmlError::StringOffsetOutOfRange {
            offset,
            size: h.string_data_size,
        };
        if offset >= h.string_data_size {
            return Err(out_of_range);
        }
        let start = h.string_data_offset as usize;
        let pool = self
            .buf
            .get(start..start + h.string_data_size as usize)
            .ok_or(out_of_range.clone())?;
        let tail = pool.get(offset as usize..).ok_or(out_of_range)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }
}
