//! Read-only view over the binary registry document.
//!
//! The document is the output of the XML converter tool: a fixed header of
//! five segment descriptors followed by the segment payloads (interned
//! strings, the unique-string index, child nodes, attributes, elements).
//! All ids are 32-bit; id 0 means "absent". Attribute runs and the
//! unique-string index are stored in Eytzinger order, so lookups descend an
//! implicit tree instead of bisecting.

use std::cmp::Ordering;

/// Byte offset of a string inside the strings segment. Offset 0 is the
/// empty sentinel string, which doubles as "no value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StrId(pub u32);

impl StrId {
    pub const NONE: StrId = StrId(0);

    pub fn present(self) -> bool {
        self.0 != 0
    }
}

/// Index into the elements segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElemId(pub u32);

/// A child of an element: either raw text or a nested element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Text(StrId),
    Element(ElemId),
}

/// A run inside the nodes or attributes segment.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Seq {
    pub(crate) start: u32,
    pub(crate) count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Element {
    pub tag: StrId,
    pub(crate) attrs: Seq,
    pub(crate) children: Seq,
}

#[derive(Debug, Clone, Copy)]
struct Attr {
    name: StrId,
    value: StrId,
}

#[derive(Debug, Clone, Copy, Default)]
struct Segment {
    offset: u32,
    count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Header {
    strings: Segment,
    unique_strings: Segment,
    nodes: Segment,
    attrs: Segment,
    elems: Segment,
}

/// Size in bytes of the on-disk header (five segments of two `u32`s each).
pub const HEADER_LEN: usize = 40;

pub(crate) const NODE_SIZE: usize = 4;
pub(crate) const ATTR_SIZE: usize = 8;
pub(crate) const ELEM_SIZE: usize = 20;

/// The parsed document. Copyable: two words plus the decoded header, all
/// payload access goes back to the underlying buffer.
#[derive(Debug, Clone, Copy)]
pub struct Document {
    bytes: &'static [u8],
    header: Header,
}

impl Document {
    /// Wraps a buffer produced by the converter tool. The buffer is trusted;
    /// a malformed document is the converter's bug, not an error we recover
    /// from here.
    pub fn new(bytes: &'static [u8]) -> Document {
        let seg = |i: usize| Segment {
            offset: read_u32(bytes, i * 8),
            count: read_u32(bytes, i * 8 + 4),
        };
        Document {
            bytes,
            header: Header {
                strings: seg(0),
                unique_strings: seg(1),
                nodes: seg(2),
                attrs: seg(3),
                elems: seg(4),
            },
        }
    }

    /// The NUL-terminated string at `id`.
    pub fn str(&self, id: StrId) -> &'static str {
        let start = self.header.strings.offset as usize + id.0 as usize;
        let bytes = &self.bytes[start..];
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..len]).unwrap()
    }

    /// Looks `value` up in the unique-string index. Element tags and
    /// attribute names are always interned, so a [`None`] here means the
    /// document never mentions `value` at all.
    pub fn intern(&self, value: &str) -> Option<StrId> {
        let base = self.header.unique_strings.offset as usize;
        let count = self.header.unique_strings.count;
        // Slot 0 is the sentinel; 1..count is the Eytzinger tree.
        let mut k: u32 = 1;
        while k < count {
            let id = StrId(read_u32(self.bytes, base + k as usize * 4));
            match self.str(id).cmp(value) {
                Ordering::Equal => return Some(id),
                ord => k = (k << 1) | u32::from(ord == Ordering::Less),
            }
        }
        None
    }

    pub fn element(&self, id: ElemId) -> Element {
        let base = self.header.elems.offset as usize + id.0 as usize * ELEM_SIZE;
        Element {
            tag: StrId(read_u32(self.bytes, base)),
            attrs: Seq {
                start: read_u32(self.bytes, base + 4),
                count: read_u32(self.bytes, base + 8),
            },
            children: Seq {
                start: read_u32(self.bytes, base + 12),
                count: read_u32(self.bytes, base + 16),
            },
        }
    }

    /// The document root (the converter writes it first).
    pub fn root(&self) -> Element {
        self.element(ElemId(0))
    }

    pub fn children(&self, elem: &Element) -> impl Iterator<Item = Node> {
        let doc = *self;
        let base = doc.header.nodes.offset as usize + elem.children.start as usize * NODE_SIZE;
        (0..elem.children.count as usize).map(move |i| {
            let raw = read_u32(doc.bytes, base + i * NODE_SIZE);
            if raw & 1 == 0 {
                Node::Text(StrId(raw >> 1))
            } else {
                Node::Element(ElemId(raw >> 1))
            }
        })
    }

    /// Child elements carrying `tag`, in document order.
    pub fn tagged_children(
        &self,
        elem: &Element,
        tag: StrId,
    ) -> impl Iterator<Item = (ElemId, Element)> {
        let doc = *self;
        self.children(elem).filter_map(move |node| match node {
            Node::Element(id) => {
                let elem = doc.element(id);
                (elem.tag == tag).then_some((id, elem))
            }
            Node::Text(_) => None,
        })
    }

    /// Attribute lookup over the element's Eytzinger-ordered run, keyed by
    /// the interned attribute name.
    pub fn find_attr(&self, elem: &Element, name: StrId) -> Option<StrId> {
        let run = elem.attrs;
        let mut k: u32 = 1;
        while k <= run.count {
            let attr = self.attr(run.start + k - 1);
            if attr.name == name {
                return Some(attr.value);
            }
            k = (k << 1) | u32::from(attr.name < name);
        }
        None
    }

    /// The element's text, when its sole child is a text node.
    pub fn text(&self, elem: &Element) -> Option<StrId> {
        if elem.children.count != 1 {
            return None;
        }
        match self.children(elem).next() {
            Some(Node::Text(id)) => Some(id),
            _ => None,
        }
    }

    /// The text of the first `tag` child that has single-text content.
    pub fn child_text(&self, elem: &Element, tag: StrId) -> Option<StrId> {
        self.children(elem).find_map(|node| match node {
            Node::Element(id) => {
                let child = self.element(id);
                if child.tag == tag {
                    self.text(&child)
                } else {
                    None
                }
            }
            Node::Text(_) => None,
        })
    }

    fn attr(&self, index: u32) -> Attr {
        let base = self.header.attrs.offset as usize + index as usize * ATTR_SIZE;
        Attr {
            name: StrId(read_u32(self.bytes, base)),
            value: StrId(read_u32(self.bytes, base + 4)),
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
}
