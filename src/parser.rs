use crate::boxes::{BoxHeader, BoxNode, FourCC, HEADER_SIZE};
use crate::cursor::ByteCursor;
use crate::registry::{BoxFields, Handling, Registry};
use std::io::Read;
use tracing::{debug, trace, warn};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated { offset: u64, needed: u64, available: u64 },
    #[error("invalid box size {size} for '{typ}'")]
    InvalidSize { typ: FourCC, size: u32 },
    #[error(
        "unsupported box size {size} for '{typ}' \
         (extended and to-end-of-file sizes are not handled)"
    )]
    UnsupportedSize { typ: FourCC, size: u32 },
    #[error("'{typ}' of size {size} exceeds the {remaining} bytes left in its parent")]
    ExceedsParent { typ: FourCC, size: u32, remaining: u64 },
    #[error("{remaining} trailing bytes in '{parent}' are too short for a box header")]
    TrailingBytes { parent: FourCC, remaining: u64 },
    #[error("boxes nested deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
    #[error("malformed '{typ}': {reason}")]
    Malformed { typ: FourCC, reason: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest nesting level accepted; root boxes are level 0.
    pub max_depth: usize,
    /// Keep the raw payload of every non-container box.
    pub keep_payload: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_depth: 64, keep_payload: false }
    }
}

/// Root boxes read before parsing stopped, and why it stopped early.
#[derive(Debug)]
pub struct ParseOutcome {
    pub boxes: Vec<BoxNode>,
    /// `None` when the input ended exactly on a box boundary.
    pub error: Option<ParseError>,
}

impl ParseOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<BoxNode>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.boxes),
        }
    }
}

/// Read one `size` + `type` header.
///
/// Returns `Ok(None)` when the source is exhausted before the first byte of
/// the header; a header cut off part way is [`ParseError::Truncated`].
pub fn read_box_header<R: Read>(cur: &mut ByteCursor<R>) -> Result<Option<BoxHeader>> {
    let start = cur.position();
    let Some(size) = cur.try_read_u32()? else {
        return Ok(None);
    };
    let typ = FourCC(cur.read_array::<4>()?);

    match size {
        0 | 1 => Err(ParseError::UnsupportedSize { typ, size }),
        s if s < HEADER_SIZE => Err(ParseError::InvalidSize { typ, size }),
        _ => Ok(Some(BoxHeader { size, typ, start })),
    }
}

/// Recursive box reader over a forward-only source.
///
/// Every box consumes exactly its declared size, whether or not its type is
/// understood, and a container's children must fit exactly in the
/// container's payload.
pub struct BoxReader<'r> {
    registry: &'r Registry,
    options: ParseOptions,
}

impl<'r> BoxReader<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry, options: ParseOptions::default() }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse root boxes until the source ends.
    ///
    /// A failure stops the loop; boxes completed before it are kept and
    /// the box being read when it happened is dropped.
    pub fn parse<R: Read>(&self, src: R) -> ParseOutcome {
        let mut cur = ByteCursor::new(src);
        let mut boxes = Vec::new();
        loop {
            let step = read_box_header(&mut cur)
                .and_then(|h| h.map(|h| self.read_box(&mut cur, h, 0)).transpose());
            match step {
                Ok(Some(node)) => boxes.push(node),
                Ok(None) => return ParseOutcome { boxes, error: None },
                Err(e) => {
                    warn!(offset = cur.position(), parsed = boxes.len(), "parse stopped: {}", e);
                    return ParseOutcome { boxes, error: Some(e) };
                }
            }
        }
    }

    /// Like [`parse`](Self::parse) but any early stop is an error.
    pub fn parse_strict<R: Read>(&self, src: R) -> Result<Vec<BoxNode>> {
        self.parse(src).into_result()
    }

    /// Read the payload of a box whose header has just been consumed.
    pub fn read_box<R: Read>(
        &self,
        cur: &mut ByteCursor<R>,
        hdr: BoxHeader,
        depth: usize,
    ) -> Result<BoxNode> {
        if depth > self.options.max_depth {
            return Err(ParseError::TooDeep { max_depth: self.options.max_depth });
        }
        if hdr.size < HEADER_SIZE {
            return Err(ParseError::InvalidSize { typ: hdr.typ, size: hdr.size });
        }

        let entry = self.registry.lookup(&hdr.typ);
        trace!(
            typ = %hdr.typ,
            size = hdr.size,
            offset = hdr.start,
            depth,
            name = entry.map(|e| e.name.as_str()).unwrap_or("unknown"),
            "box"
        );

        let mut children = Vec::new();
        let mut payload = None;
        let fields = match entry.map(|e| &e.handling) {
            Some(Handling::Container) => {
                children = self.read_children(cur, &hdr, depth + 1)?;
                BoxFields::Container
            }
            Some(Handling::Ignore) => {
                debug!("({}) {} bytes were ignored", hdr.typ, hdr.payload_len());
                payload = self.consume(cur, &hdr)?;
                BoxFields::Ignored { bytes: hdr.payload_len() }
            }
            Some(Handling::Decode(dec)) => {
                let bytes = cur.read_bytes(hdr.payload_len() as u64)?;
                let decoded = {
                    let start = hdr.start + HEADER_SIZE as u64;
                    let mut body = ByteCursor::with_offset(bytes.as_slice(), start);
                    dec.decode(&hdr, &mut body)
                };
                if self.options.keep_payload {
                    payload = Some(bytes);
                }
                match decoded {
                    Ok(fields) => fields,
                    Err(e) => {
                        warn!(typ = %hdr.typ, offset = hdr.start, "could not decode: {}", e);
                        let reason = match e {
                            ParseError::Malformed { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        BoxFields::Malformed { reason }
                    }
                }
            }
            None => {
                debug!("({}) {} bytes were skipped", hdr.typ, hdr.payload_len());
                payload = self.consume(cur, &hdr)?;
                BoxFields::None
            }
        };

        Ok(BoxNode {
            size: hdr.size,
            typ: hdr.typ,
            offset: hdr.start,
            depth,
            fields,
            children,
            payload,
        })
    }

    // Children of `parent`, read until its payload budget is used up.
    fn read_children<R: Read>(
        &self,
        cur: &mut ByteCursor<R>,
        parent: &BoxHeader,
        depth: usize,
    ) -> Result<Vec<BoxNode>> {
        let mut remaining = parent.payload_len() as u64;
        let mut kids = Vec::new();
        while remaining > 0 {
            if remaining < HEADER_SIZE as u64 {
                return Err(ParseError::TrailingBytes { parent: parent.typ, remaining });
            }
            let offset = cur.position();
            let hdr = read_box_header(cur)?.ok_or(ParseError::Truncated {
                offset,
                needed: remaining,
                available: 0,
            })?;
            if hdr.size as u64 > remaining {
                let (typ, size) = (hdr.typ, hdr.size);
                return Err(ParseError::ExceedsParent { typ, size, remaining });
            }
            kids.push(self.read_box(cur, hdr, depth)?);
            remaining -= hdr.size as u64;
        }
        Ok(kids)
    }

    fn consume<R: Read>(
        &self,
        cur: &mut ByteCursor<R>,
        hdr: &BoxHeader,
    ) -> Result<Option<Vec<u8>>> {
        let len = hdr.payload_len() as u64;
        if self.options.keep_payload {
            cur.read_bytes(len).map(Some)
        } else {
            cur.skip(len).map(|_| None)
        }
    }
}

/// Parse with the standard registry and default options.
pub fn parse_boxes<R: Read>(src: R) -> ParseOutcome {
    BoxReader::new(crate::registry::default_registry()).parse(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(size: u32, typ: &[u8; 4]) -> Vec<u8> {
        let mut v = size.to_be_bytes().to_vec();
        v.extend_from_slice(typ);
        v
    }

    #[test]
    fn header_sizes_below_eight_are_rejected() {
        let data = header(4, b"abcd");
        let mut cur = ByteCursor::new(&data[..]);
        assert!(matches!(read_box_header(&mut cur), Err(ParseError::InvalidSize { size: 4, .. })));

        let data = header(1, b"mdat");
        let mut cur = ByteCursor::new(&data[..]);
        assert!(matches!(
            read_box_header(&mut cur),
            Err(ParseError::UnsupportedSize { size: 1, .. })
        ));

        let data = header(0, b"mdat");
        let mut cur = ByteCursor::new(&data[..]);
        assert!(matches!(
            read_box_header(&mut cur),
            Err(ParseError::UnsupportedSize { size: 0, .. })
        ));
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        // moov > moov > moov > moov, each wrapping the next
        let mut data = header(8, b"moov");
        for _ in 0..3 {
            let mut outer = header(data.len() as u32 + 8, b"moov");
            outer.extend_from_slice(&data);
            data = outer;
        }
        let registry = Registry::new().with_container(FourCC(*b"moov"), "Movie Box");

        let shallow = BoxReader::new(&registry)
            .with_options(ParseOptions { max_depth: 2, keep_payload: false })
            .parse(&data[..]);
        assert!(matches!(shallow.error, Some(ParseError::TooDeep { max_depth: 2 })));
        assert!(shallow.boxes.is_empty());

        let deep = BoxReader::new(&registry).parse_strict(&data[..]).unwrap();
        assert_eq!(deep[0].children[0].children[0].children[0].depth, 3);
    }

    #[test]
    fn hand_built_header_below_eight_is_rejected() {
        let hdr = BoxHeader { size: 4, typ: FourCC(*b"free"), start: 0 };
        let data = [0u8; 16];
        let mut cur = ByteCursor::new(&data[..]);
        let reader = BoxReader::new(crate::registry::default_registry());
        assert!(matches!(
            reader.read_box(&mut cur, hdr, 0),
            Err(ParseError::InvalidSize { size: 4, .. })
        ));
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn decoder_failure_keeps_only_the_reason() {
        // elst claiming 3 entries with no entry bytes
        let mut data = header(16, b"elst");
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 3]);
        let boxes = parse_boxes(&data[..]).into_result().unwrap();
        match &boxes[0].fields {
            BoxFields::Malformed { reason } => {
                assert_eq!(reason, "3 entries do not fit in 0 bytes");
            }
            other => panic!("expected malformed elst, got {:?}", other),
        }
    }
}
