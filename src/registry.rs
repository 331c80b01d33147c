use crate::boxes::{BoxHeader, FourCC};
use crate::cursor::ByteCursor;
use crate::fields::{
    Fixed16_16, Fixed8_8, Matrix, Timestamp, VersionFlags, language_from_u16, read_fixed16_16,
    read_fixed8_8, read_fourcc, read_matrix, read_timestamp32, read_timestamp64,
    read_version_flags,
};
use crate::parser::{ParseError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Decoded content of a box, one variant per understood layout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoxFields {
    /// No decoder registered; payload skipped.
    None,
    /// Payload is a sequence of child boxes.
    Container,
    /// Payload consumed on purpose (`free`, `skip`).
    Ignored { bytes: u32 },
    FileType(FileType),
    MovieHeader(MovieHeader),
    TrackHeader(TrackHeader),
    MediaHeader(MediaHeader),
    HandlerReference(HandlerReference),
    EditList(EditList),
    /// A registered decoder ran out of payload or rejected the layout.
    Malformed { reason: String },
}

impl BoxFields {
    pub fn is_none(&self) -> bool {
        matches!(self, BoxFields::None)
    }
}

/// File Type Box (ftyp)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileType {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

/// Movie Header Box (mvhd)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieHeader {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Timestamp,
    pub modification_time: Timestamp,
    pub time_scale: u32,
    pub duration: u64,
    pub preferred_rate: Fixed16_16,
    pub preferred_volume: Fixed8_8,
    pub matrix: Matrix,
    pub preview_time: u32,
    pub preview_duration: u32,
    pub poster_time: u32,
    pub selection_time: u32,
    pub selection_duration: u32,
    pub current_time: u32,
    pub next_track_id: u32,
}

/// Track Header Box (tkhd)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackHeader {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Timestamp,
    pub modification_time: Timestamp,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: Fixed8_8,
    pub matrix: Matrix,
    pub width: Fixed16_16,
    pub height: Fixed16_16,
}

/// Media Header Box (mdhd)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaHeader {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Timestamp,
    pub modification_time: Timestamp,
    pub time_scale: u32,
    pub duration: u64,
    pub language: String,
}

/// Handler Reference Box (hdlr)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerReference {
    pub version: u8,
    pub flags: u32,
    pub handler_type: FourCC,
    pub name: String,
}

/// Edit List Box (elst)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditList {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<EditEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EditEntry {
    pub segment_duration: u64,
    /// -1 marks an empty edit.
    pub media_time: i64,
    pub media_rate: Fixed16_16,
}

/// Trait for per-type payload decoders.
///
/// The reader hands a decoder the complete payload of one box (everything
/// after the 8-byte header). Bytes the decoder leaves unread are ignored,
/// so a decoder never affects the alignment of the next sibling.
pub trait BoxDecoder: Send + Sync {
    fn decode(&self, hdr: &BoxHeader, payload: &mut ByteCursor<&[u8]>) -> Result<BoxFields>;
}

/// What the reader does with a registered box type.
pub enum Handling {
    /// Recurse into the payload as child boxes.
    Container,
    /// Consume the payload without looking at it.
    Ignore,
    Decode(Box<dyn BoxDecoder>),
}

pub struct RegisteredBox {
    pub name: String,
    pub handling: Handling,
}

/// Registry of box handlers keyed by type tag.
///
/// The registry is immutable once constructed; use the `with_*` builders
/// to assemble one. Tags with no entry are skipped by the reader.
pub struct Registry {
    map: HashMap<FourCC, RegisteredBox>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// The full set of handlers this crate knows about.
    pub fn standard() -> Self {
        Registry::new()
            .with_decoder(FourCC(*b"ftyp"), "File Type Box", Box::new(FtypDecoder))
            .with_container(FourCC(*b"moov"), "Movie Box")
            .with_decoder(FourCC(*b"mvhd"), "Movie Header Box", Box::new(MvhdDecoder))
            .with_container(FourCC(*b"trak"), "Track Box")
            .with_decoder(FourCC(*b"tkhd"), "Track Header Box", Box::new(TkhdDecoder))
            .with_container(FourCC(*b"edts"), "Edit Box")
            .with_decoder(FourCC(*b"elst"), "Edit List Box", Box::new(ElstDecoder))
            .with_container(FourCC(*b"mdia"), "Media Box")
            .with_decoder(FourCC(*b"mdhd"), "Media Header Box", Box::new(MdhdDecoder))
            .with_decoder(FourCC(*b"hdlr"), "Handler Reference Box", Box::new(HdlrDecoder))
            .with_container(FourCC(*b"minf"), "Media Information Box")
            .with_container(FourCC(*b"dinf"), "Data Information Box")
            .with_container(FourCC(*b"stbl"), "Sample Table Box")
            .with_container(FourCC(*b"mvex"), "Movie Extends Box")
            .with_container(FourCC(*b"moof"), "Movie Fragment Box")
            .with_container(FourCC(*b"traf"), "Track Fragment Box")
            .with_container(FourCC(*b"mfra"), "Movie Fragment Random Access Box")
            .with_ignored(FourCC(*b"free"), "Free Space Box")
            .with_ignored(FourCC(*b"skip"), "Free Space Box")
    }

    fn with(mut self, typ: FourCC, name: &str, handling: Handling) -> Self {
        self.map.insert(typ, RegisteredBox { name: name.to_string(), handling });
        self
    }

    pub fn with_container(self, typ: FourCC, name: &str) -> Self {
        self.with(typ, name, Handling::Container)
    }

    pub fn with_ignored(self, typ: FourCC, name: &str) -> Self {
        self.with(typ, name, Handling::Ignore)
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable and used only for logging.
    pub fn with_decoder(self, typ: FourCC, name: &str, dec: Box<dyn BoxDecoder>) -> Self {
        self.with(typ, name, Handling::Decode(dec))
    }

    pub fn lookup(&self, typ: &FourCC) -> Option<&RegisteredBox> {
        self.map.get(typ)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::standard);

/// Process-wide standard registry, built on first use.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

// ---------- Decoders ----------

fn malformed(hdr: &BoxHeader, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed { typ: hdr.typ, reason: reason.into() }
}

fn check_version(hdr: &BoxHeader, vf: VersionFlags) -> Result<()> {
    if vf.version > 1 {
        return Err(malformed(hdr, format!("unsupported version {}", vf.version)));
    }
    Ok(())
}

// version 0 stores times and duration as 32 bits, version 1 as 64
fn read_times(
    cur: &mut ByteCursor<&[u8]>,
    version: u8,
) -> Result<(Timestamp, Timestamp)> {
    if version == 1 {
        Ok((read_timestamp64(cur)?, read_timestamp64(cur)?))
    } else {
        Ok((read_timestamp32(cur)?, read_timestamp32(cur)?))
    }
}

fn read_duration(cur: &mut ByteCursor<&[u8]>, version: u8) -> Result<u64> {
    if version == 1 { cur.read_u64() } else { Ok(cur.read_u32()? as u64) }
}

// ftyp: major + minor + compatible brands
pub struct FtypDecoder;

impl BoxDecoder for FtypDecoder {
    fn decode(&self, _hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let major_brand = read_fourcc(cur)?;
        let minor_version = cur.read_u32()?;

        // a trailing partial brand is left unread
        let rest = cur.read_to_end()?;
        let compatible_brands = rest
            .chunks_exact(4)
            .map(|c| FourCC([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(BoxFields::FileType(FileType { major_brand, minor_version, compatible_brands }))
    }
}

// mvhd: movie-wide timing, playback defaults and transform
pub struct MvhdDecoder;

impl BoxDecoder for MvhdDecoder {
    fn decode(&self, hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let vf = read_version_flags(cur)?;
        check_version(hdr, vf)?;

        let (creation_time, modification_time) = read_times(cur, vf.version)?;
        let time_scale = cur.read_u32()?;
        let duration = read_duration(cur, vf.version)?;
        let preferred_rate = read_fixed16_16(cur)?;
        let preferred_volume = read_fixed8_8(cur)?;
        cur.skip(10)?; // reserved
        let matrix = read_matrix(cur)?;

        Ok(BoxFields::MovieHeader(MovieHeader {
            version: vf.version,
            flags: vf.flags,
            creation_time,
            modification_time,
            time_scale,
            duration,
            preferred_rate,
            preferred_volume,
            matrix,
            preview_time: cur.read_u32()?,
            preview_duration: cur.read_u32()?,
            poster_time: cur.read_u32()?,
            selection_time: cur.read_u32()?,
            selection_duration: cur.read_u32()?,
            current_time: cur.read_u32()?,
            next_track_id: cur.read_u32()?,
        }))
    }
}

// tkhd: track id, duration, presentation and size
pub struct TkhdDecoder;

impl BoxDecoder for TkhdDecoder {
    fn decode(&self, hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let vf = read_version_flags(cur)?;
        check_version(hdr, vf)?;

        let (creation_time, modification_time) = read_times(cur, vf.version)?;
        let track_id = cur.read_u32()?;
        cur.skip(4)?;
        let duration = read_duration(cur, vf.version)?;
        cur.skip(8)?;
        let layer = cur.read_u16()? as i16;
        let alternate_group = cur.read_u16()? as i16;
        let volume = read_fixed8_8(cur)?;
        cur.skip(2)?;
        let matrix = read_matrix(cur)?;
        let width = read_fixed16_16(cur)?;
        let height = read_fixed16_16(cur)?;

        Ok(BoxFields::TrackHeader(TrackHeader {
            version: vf.version,
            flags: vf.flags,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        }))
    }
}

// mdhd: media timescale, duration and language
pub struct MdhdDecoder;

impl BoxDecoder for MdhdDecoder {
    fn decode(&self, hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let vf = read_version_flags(cur)?;
        check_version(hdr, vf)?;

        let (creation_time, modification_time) = read_times(cur, vf.version)?;
        let time_scale = cur.read_u32()?;
        let duration = read_duration(cur, vf.version)?;
        let language = language_from_u16(cur.read_u16()?);

        Ok(BoxFields::MediaHeader(MediaHeader {
            version: vf.version,
            flags: vf.flags,
            creation_time,
            modification_time,
            time_scale,
            duration,
            language,
        }))
    }
}

// hdlr: handler type and name
pub struct HdlrDecoder;

impl BoxDecoder for HdlrDecoder {
    fn decode(&self, _hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let vf = read_version_flags(cur)?;
        cur.skip(4)?; // pre_defined
        let handler_type = read_fourcc(cur)?;
        cur.skip(12)?; // reserved

        // name: null-terminated string (or just rest of box)
        let mut name_bytes = cur.read_to_end()?;
        if let Some(nul) = name_bytes.iter().position(|&b| b == 0) {
            name_bytes.truncate(nul);
        }

        Ok(BoxFields::HandlerReference(HandlerReference {
            version: vf.version,
            flags: vf.flags,
            handler_type,
            name: String::from_utf8_lossy(&name_bytes).into_owned(),
        }))
    }
}

// elst: edit list
pub struct ElstDecoder;

impl BoxDecoder for ElstDecoder {
    fn decode(&self, hdr: &BoxHeader, cur: &mut ByteCursor<&[u8]>) -> Result<BoxFields> {
        let vf = read_version_flags(cur)?;
        check_version(hdr, vf)?;

        let entry_count = cur.read_u32()?;
        let entry_size: u64 = if vf.version == 1 { 20 } else { 12 };
        let available = (hdr.payload_len() as u64).saturating_sub(8);
        if entry_count as u64 * entry_size > available {
            return Err(malformed(
                hdr,
                format!("{} entries do not fit in {} bytes", entry_count, available),
            ));
        }

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let (segment_duration, media_time) = if vf.version == 1 {
                (cur.read_u64()?, cur.read_u64()? as i64)
            } else {
                (cur.read_u32()? as u64, cur.read_u32()? as i32 as i64)
            };
            let media_rate = read_fixed16_16(cur)?;
            entries.push(EditEntry { segment_duration, media_time, media_rate });
        }

        Ok(BoxFields::EditList(EditList { version: vf.version, flags: vf.flags, entries }))
    }
}
