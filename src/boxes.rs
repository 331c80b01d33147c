use crate::registry::BoxFields;
use serde::{Serialize, Serializer};
use std::fmt;

/// Size of the plain `size` + `type` box header.
pub const HEADER_SIZE: u32 = 8;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: u32,   // total size including the 8-byte header
    pub typ: FourCC,
    pub start: u64,  // offset of the header from the start of the source
}

impl BoxHeader {
    /// Number of payload bytes following the header, 0 for a header that
    /// declares less than its own 8 bytes.
    pub fn payload_len(&self) -> u32 {
        self.size.saturating_sub(HEADER_SIZE)
    }
}

/// One parsed box and the subtree it owns.
///
/// Nodes are built once by the reader and not mutated afterwards. `fields`
/// is [`BoxFields::None`] for boxes without a registered decoder, and
/// `children` is empty for anything that is not a container.
#[derive(Debug, Clone, Serialize)]
pub struct BoxNode {
    pub size: u32,
    #[serde(rename = "type")]
    pub typ: FourCC,
    pub offset: u64,
    /// Nesting level, 0 for root boxes. Only used for indentation.
    #[serde(skip)]
    pub depth: usize,
    #[serde(skip_serializing_if = "BoxFields::is_none")]
    pub fields: BoxFields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BoxNode>,
    /// Raw payload bytes, retained for non-container boxes only when
    /// `ParseOptions::keep_payload` is set.
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

impl BoxNode {
    pub fn is_container(&self) -> bool {
        matches!(self.fields, BoxFields::Container)
    }

    /// First direct child with the given type.
    pub fn child(&self, typ: &[u8; 4]) -> Option<&BoxNode> {
        self.children.iter().find(|c| &c.typ.0 == typ)
    }

    /// Re-serialize the box framing: header followed by either the
    /// children's bytes or the retained payload.
    ///
    /// Returns `None` when a non-container box in the subtree was parsed
    /// without `keep_payload`.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size as usize);
        self.write_bytes(&mut out)?;
        Some(out)
    }

    fn write_bytes(&self, out: &mut Vec<u8>) -> Option<()> {
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.typ.0);
        if self.is_container() {
            for c in &self.children {
                c.write_bytes(out)?;
            }
        } else {
            out.extend_from_slice(self.payload.as_deref()?);
        }
        Some(())
    }
}
