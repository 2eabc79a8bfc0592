//! In-memory encoder for the binary document format.
//!
//! The read side lives in [`crate::doc`]; this module produces the same
//! layout from an element tree. The converter tool feeds it the parsed XML,
//! and tests use it to build registry fixtures directly.

use crate::doc::{ATTR_SIZE, ELEM_SIZE, HEADER_LEN, NODE_SIZE};
use crate::sort::eytzinger;
use std::collections::BTreeMap;

/// A node of the tree handed to [`encode`].
#[derive(Debug, Clone)]
pub enum NodeDesc {
    Text(String),
    Element(ElemDesc),
}

/// An element description, built up with the chaining helpers.
#[derive(Debug, Clone)]
pub struct ElemDesc {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeDesc>,
}

pub fn elem(tag: &str) -> ElemDesc {
    ElemDesc {
        tag: tag.to_owned(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

impl ElemDesc {
    pub fn attr(mut self, name: &str, value: &str) -> ElemDesc {
        self.attrs.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn child(mut self, child: ElemDesc) -> ElemDesc {
        self.children.push(NodeDesc::Element(child));
        self
    }

    pub fn text(mut self, text: &str) -> ElemDesc {
        self.children.push(NodeDesc::Text(text.to_owned()));
        self
    }
}

/// Encodes `root` into the binary document layout.
pub fn encode(root: &ElemDesc) -> Vec<u8> {
    let mut encoder = Encoder {
        // Offset 0 holds the empty sentinel string.
        strings: vec![0],
        unique: BTreeMap::new(),
        nodes: Vec::new(),
        attrs: Vec::new(),
        elems: Vec::new(),
    };
    encoder.build_elem(root);
    encoder.finish()
}

struct Encoder {
    strings: Vec<u8>,
    unique: BTreeMap<String, u32>,
    nodes: Vec<u32>,
    attrs: Vec<(u32, u32)>,
    elems: Vec<[u32; 5]>,
}

impl Encoder {
    fn add_str(&mut self, s: &str) -> u32 {
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        offset
    }

    fn unique_str(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.unique.get(s) {
            return id;
        }
        let id = self.add_str(s);
        self.unique.insert(s.to_owned(), id);
        id
    }

    fn build_elem(&mut self, desc: &ElemDesc) {
        let tag = self.unique_str(&desc.tag);

        let mut attr_list: Vec<(u32, u32)> = desc
            .attrs
            .iter()
            .map(|(name, value)| (self.unique_str(name), self.add_str(value)))
            .collect();
        attr_list.sort_by_key(|&(name, _)| name);
        let attr_start = self.attrs.len() as u32;
        let attr_count = attr_list.len() as u32;
        self.attrs.resize(self.attrs.len() + attr_list.len(), (0, 0));
        let mut slots = Vec::with_capacity(attr_list.len());
        eytzinger(attr_count, |k| slots.push(k));
        for (slot, attr) in slots.into_iter().zip(attr_list) {
            self.attrs[(attr_start + slot) as usize] = attr;
        }

        let child_start = self.nodes.len();
        let child_count = desc.children.len() as u32;
        self.nodes.resize(child_start + desc.children.len(), 0);
        self.elems.push([tag, attr_start, attr_count, child_start as u32, child_count]);

        for (i, child) in desc.children.iter().enumerate() {
            let node = match child {
                NodeDesc::Text(text) => self.add_str(text) << 1,
                NodeDesc::Element(child) => {
                    let node = ((self.elems.len() as u32) << 1) | 1;
                    self.build_elem(child);
                    node
                }
            };
            self.nodes[child_start + i] = node;
        }
    }

    fn finish(self) -> Vec<u8> {
        // Slot 0 of the unique-string index is a sentinel; the tree starts
        // at slot 1.
        let sorted: Vec<u32> = self.unique.values().copied().collect();
        let mut unique_list = vec![0u32; sorted.len() + 1];
        let mut slots = Vec::with_capacity(sorted.len());
        eytzinger(sorted.len() as u32, |k| slots.push(k));
        for (slot, id) in slots.into_iter().zip(sorted) {
            unique_list[slot as usize + 1] = id;
        }

        let align = |offset: usize| (offset + 3) & !3;
        let strings_offset = HEADER_LEN;
        let unique_offset = align(strings_offset + self.strings.len());
        let nodes_offset = align(unique_offset + unique_list.len() * 4);
        let attrs_offset = align(nodes_offset + self.nodes.len() * NODE_SIZE);
        let elems_offset = align(attrs_offset + self.attrs.len() * ATTR_SIZE);
        let total = elems_offset + self.elems.len() * ELEM_SIZE;

        let mut out = vec![0u8; total];
        let segments = [
            (strings_offset, self.strings.len()),
            (unique_offset, unique_list.len()),
            (nodes_offset, self.nodes.len()),
            (attrs_offset, self.attrs.len()),
            (elems_offset, self.elems.len()),
        ];
        for (i, (offset, count)) in segments.into_iter().enumerate() {
            write_u32(&mut out, i * 8, offset as u32);
            write_u32(&mut out, i * 8 + 4, count as u32);
        }

        out[strings_offset..strings_offset + self.strings.len()].copy_from_slice(&self.strings);
        for (i, id) in unique_list.into_iter().enumerate() {
            write_u32(&mut out, unique_offset + i * 4, id);
        }
        for (i, node) in self.nodes.into_iter().enumerate() {
            write_u32(&mut out, nodes_offset + i * NODE_SIZE, node);
        }
        for (i, (name, value)) in self.attrs.into_iter().enumerate() {
            write_u32(&mut out, attrs_offset + i * ATTR_SIZE, name);
            write_u32(&mut out, attrs_offset + i * ATTR_SIZE + 4, value);
        }
        for (i, fields) in self.elems.into_iter().enumerate() {
            for (j, field) in fields.into_iter().enumerate() {
                write_u32(&mut out, elems_offset + i * ELEM_SIZE + j * 4, field);
            }
        }
        out
    }
}

fn write_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}
