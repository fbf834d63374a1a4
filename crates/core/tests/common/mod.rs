//! Shared fixtures: a CryXmlB encoder, an in-memory zip builder and a fake install tree.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sc_bindings_core::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Encode `root` as CryXmlB: header, node table (preorder), attribute table, child-index
/// table, string pool (with `""` at offset 0).
pub fn encode_cryxml(root: &XmlNode) -> Vec<u8> {
    let mut flat: Vec<(&XmlNode, u32, Vec<u32>)> = Vec::new();
    flatten(root, u32::MAX, &mut flat);

    let mut pool = StringPool::default();
    pool.intern("");

    let mut nodes = Vec::new();
    let mut attrs = Vec::new();
    let mut children = Vec::new();
    let mut attr_count = 0u32;
    let mut child_count = 0u32;
    for (node, parent, kids) in &flat {
        let tag = pool.intern(&node.tag);
        let content = pool.intern(&node.content);
        push_u32(&mut nodes, tag);
        push_u32(&mut nodes, content);
        nodes.extend_from_slice(&(node.attributes.len() as u16).to_le_bytes());
        nodes.extend_from_slice(&(kids.len() as u16).to_le_bytes());
        push_u32(&mut nodes, *parent);
        push_u32(&mut nodes, attr_count);
        push_u32(&mut nodes, child_count);
        push_u32(&mut nodes, 0);

        for (k, v) in &node.attributes {
            let k = pool.intern(k);
            let v = pool.intern(v);
            push_u32(&mut attrs, k);
            push_u32(&mut attrs, v);
        }
        attr_count += node.attributes.len() as u32;
        for &kid in kids {
            push_u32(&mut children, kid);
        }
        child_count += kids.len() as u32;
    }

    let node_off = 44u32;
    let attr_off = node_off + nodes.len() as u32;
    let child_off = attr_off + attrs.len() as u32;
    let str_off = child_off + children.len() as u32;
    let total = str_off + pool.bytes.len() as u32;

    let mut out = Vec::with_capacity(total as usize);
    out.extend_from_slice(b"CryXmlB\0");
    for v in [
        total,
        node_off,
        flat.len() as u32,
        attr_off,
        attr_count,
        child_off,
        child_count,
        str_off,
        pool.bytes.len() as u32,
    ] {
        push_u32(&mut out, v);
    }
    out.extend_from_slice(&nodes);
    out.extend_from_slice(&attrs);
    out.extend_from_slice(&children);
    out.extend_from_slice(&pool.bytes);
    out
}

fn flatten<'a>(n: &'a XmlNode, parent: u32, out: &mut Vec<(&'a XmlNode, u32, Vec<u32>)>) -> u32 {
    let idx = out.len() as u32;
    out.push((n, parent, Vec::new()));
    let kids: Vec<u32> = n.children.iter().map(|c| flatten(c, idx, out)).collect();
    out[idx as usize].2 = kids;
    idx
}

/// CryXmlB for a parent→child chain of `depth` `<n>` elements, written without recursion.
pub fn encode_chain(depth: u32) -> Vec<u8> {
    let node_off = 44u32;
    let child_off = node_off + depth * 28;
    let str_off = child_off + (depth - 1) * 4;
    let pool = b"\0n\0";
    let total = str_off + pool.len() as u32;

    let mut out = Vec::with_capacity(total as usize);
    out.extend_from_slice(b"CryXmlB\0");
    for v in [
        total,
        node_off,
        depth,
        child_off,
        0,
        child_off,
        depth - 1,
        str_off,
        pool.len() as u32,
    ] {
        push_u32(&mut out, v);
    }
    for i in 0..depth {
        let has_child = i + 1 < depth;
        push_u32(&mut out, 1);
        push_u32(&mut out, 0);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&u16::from(has_child).to_le_bytes());
        push_u32(&mut out, if i == 0 { u32::MAX } else { i - 1 });
        push_u32(&mut out, 0);
        push_u32(&mut out, if has_child { i } else { 0 });
        push_u32(&mut out, 0);
    }
    for i in 1..depth {
        push_u32(&mut out, i);
    }
    out.extend_from_slice(pool);
    out
}

#[derive(Default)]
struct StringPool {
    bytes: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringPool {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&o) = self.offsets.get(s) {
            return o;
        }
        let o = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(s.to_string(), o);
        o
    }
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn patch_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// A zip container with the given file entries (directories are implied by the paths).
pub fn build_zip(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        w.start_file(*name, SimpleFileOptions::default().compression_method(*method))
            .unwrap();
        w.write_all(data).unwrap();
    }
    w.finish().unwrap().into_inner()
}

/// A single-entry container the way the game writes zstd: method id 100, sizes describing the
/// zstd frame and the decoded bytes.
pub fn build_p4k_zstd_zip(name: &str, data: &[u8]) -> Vec<u8> {
    let frame = zstd::stream::encode_all(data, 3).unwrap();
    let mut zip = build_zip(&[(name, &frame, CompressionMethod::Stored)]);
    let len = data.len() as u32;

    zip[8..10].copy_from_slice(&100u16.to_le_bytes());
    patch_u32(&mut zip, 22, len);

    let central = zip
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .unwrap();
    zip[central + 10..central + 12].copy_from_slice(&100u16.to_le_bytes());
    patch_u32(&mut zip, central + 24, len);
    zip
}

/// Offset of the first entry's data (its local header starts at 0).
pub fn first_entry_data_offset(zip: &[u8]) -> usize {
    let name_len = u16::from_le_bytes([zip[26], zip[27]]) as usize;
    let extra_len = u16::from_le_bytes([zip[28], zip[29]]) as usize;
    30 + name_len + extra_len
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
}

/// The two-action default profile most pipeline tests start from.
pub fn default_profile() -> XmlNode {
    XmlNode::new("profile")
        .with_child(
            XmlNode::new("ActivationModes").with_child(
                XmlNode::new("ActivationMode")
                    .with_attribute("name", "press")
                    .with_attribute("onPress", "1"),
            ),
        )
        .with_child(
            XmlNode::new("actionmap")
                .with_attribute("name", "spaceship_weapons")
                .with_attribute("UILabel", "@ui_CGWeapons")
                .with_attribute("UICategory", "@ui_CCSpaceFlight")
                .with_child(
                    XmlNode::new("action")
                        .with_attribute("name", "v_attack1")
                        .with_attribute("UILabel", "@ui_v_attack1")
                        .with_attribute("UIDescription", "@ui_v_attack1_desc")
                        .with_attribute("onPress", "1")
                        .with_attribute("keyboard", "MOUSE1"),
                )
                .with_child(
                    XmlNode::new("action")
                        .with_attribute("name", "v_toggle_lights")
                        .with_attribute("UILabel", "@ui_v_lights")
                        .with_attribute("keyboard", "l"),
                ),
        )
}

pub const ENGLISH_INI: &str = "ui_CGWeapons=Weapons\n\
ui_CCSpaceFlight=Flight\n\
ui_v_attack1=Fire Group 1\n\
ui_v_attack1_desc=Fires the first group\n\
ui_v_lights,P=Lights\n";

pub const GERMAN_INI: &str = "ui_v_attack1=Feuergruppe 1\nui_v_lights=Licht\n";

/// An install root in memory: `Data.p4k` with a CryXmlB default profile and two languages.
pub struct FakeInstall {
    pub fs: Arc<MemoryFileSystem>,
    pub root: PathBuf,
    pub output: PathBuf,
}

impl FakeInstall {
    pub fn new() -> Self {
        Self::with_profile_bytes(encode_cryxml(&default_profile()))
    }

    pub fn with_profile_bytes(profile: Vec<u8>) -> Self {
        let zip = build_zip(&[
            (
                "Data/Libs/Config/defaultProfile.xml",
                &profile,
                CompressionMethod::Deflated,
            ),
            (
                "Data/Localization/english/global.ini",
                ENGLISH_INI.as_bytes(),
                CompressionMethod::Deflated,
            ),
            (
                "Data/Localization/german_(germany)/global.ini",
                GERMAN_INI.as_bytes(),
                CompressionMethod::Stored,
            ),
        ]);
        Self::with_archive(zip)
    }

    pub fn with_archive(zip: Vec<u8>) -> Self {
        let fs = Arc::new(MemoryFileSystem::new());
        let root = PathBuf::from("/games/StarCitizen/LIVE");
        fs.insert(root.join("Data.p4k"), zip, at(1));
        Self {
            fs,
            root,
            output: PathBuf::from("/appdata/sc-bindings/bindings.json"),
        }
    }

    pub fn request(&self) -> ExtractionRequest {
        ExtractionRequest::for_install(&self.root, &self.output)
    }

    pub fn override_path(&self) -> PathBuf {
        InstallLayout::from_root(&self.root).override_profile_path()
    }

    pub fn extractor(&self, log: Arc<dyn CoreLog>) -> BindingsExtractor {
        BindingsExtractor::new(self.fs.clone(), ExtractOptions::default(), log)
    }
}
