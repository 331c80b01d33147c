//! Human-readable rendering of a parsed box tree.
//!
//! Each node prints its type and size, then one line per decoded field,
//! then a blank line, then its children one indentation level deeper.

use crate::boxes::BoxNode;
use crate::fields::Matrix;
use crate::registry::BoxFields;
use std::fmt::{self, Display, Write};

/// Render a forest of boxes to a `String`.
pub fn render(boxes: &[BoxNode]) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_report(&mut out, boxes);
    out
}

pub fn write_report<W: Write>(out: &mut W, boxes: &[BoxNode]) -> fmt::Result {
    for b in boxes {
        write_box(out, b)?;
    }
    Ok(())
}

/// Render `node` and its subtree, indented relative to `node` itself so a
/// selected inner box starts at the left margin.
pub fn write_box<W: Write>(out: &mut W, node: &BoxNode) -> fmt::Result {
    write_nested(out, node, node.depth)
}

fn write_nested<W: Write>(out: &mut W, node: &BoxNode, base: usize) -> fmt::Result {
    let indent = "  ".repeat(node.depth.saturating_sub(base));
    let mut w = FieldWriter { out, indent: &indent };

    w.line("type", node.typ)?;
    w.line("size", node.size)?;
    write_fields(&mut w, &node.fields)?;
    writeln!(w.out)?;

    for c in &node.children {
        write_nested(&mut *w.out, c, base)?;
    }
    Ok(())
}

struct FieldWriter<'a, W> {
    out: &'a mut W,
    indent: &'a str,
}

impl<W: Write> FieldWriter<'_, W> {
    fn line(&mut self, name: &str, value: impl Display) -> fmt::Result {
        writeln!(self.out, "{}{}: {}", self.indent, name, value)
    }

    fn flags(&mut self, flags: u32) -> fmt::Result {
        self.line("flags", format_args!("0x{:06x}", flags))
    }

    fn matrix(&mut self, name: &str, m: &Matrix) -> fmt::Result {
        writeln!(self.out, "{}{}:", self.indent, name)?;
        for row in m.rows() {
            writeln!(
                self.out,
                "{}    | {:9.4} {:9.4} {:9.4} |",
                self.indent, row[0], row[1], row[2]
            )?;
        }
        Ok(())
    }
}

fn write_fields<W: Write>(w: &mut FieldWriter<'_, W>, fields: &BoxFields) -> fmt::Result {
    match fields {
        BoxFields::None | BoxFields::Container => Ok(()),
        BoxFields::Ignored { bytes } => w.line("ignored", format_args!("{} bytes", bytes)),
        BoxFields::Malformed { reason } => w.line("malformed", reason),
        BoxFields::FileType(f) => {
            w.line("major_brand", f.major_brand)?;
            w.line("minor_version", format_args!("{:#010x}", f.minor_version))?;
            let brands: Vec<String> = f.compatible_brands.iter().map(|b| b.to_string()).collect();
            w.line("compatible_brands", format_args!("[{}]", brands.join(", ")))
        }
        BoxFields::MovieHeader(m) => {
            w.line("version", m.version)?;
            w.flags(m.flags)?;
            w.line("creation_time", m.creation_time)?;
            w.line("modification_time", m.modification_time)?;
            w.line("time_scale", m.time_scale)?;
            w.line("duration", m.duration)?;
            w.line("preferred_rate", m.preferred_rate)?;
            w.line("preferred_volume", m.preferred_volume)?;
            w.matrix("matrix_structure", &m.matrix)?;
            w.line("preview_time", m.preview_time)?;
            w.line("preview_duration", m.preview_duration)?;
            w.line("poster_time", m.poster_time)?;
            w.line("selection_time", m.selection_time)?;
            w.line("selection_duration", m.selection_duration)?;
            w.line("current_time", m.current_time)?;
            w.line("next_track_id", m.next_track_id)
        }
        BoxFields::TrackHeader(t) => {
            w.line("version", t.version)?;
            w.flags(t.flags)?;
            w.line("creation_time", t.creation_time)?;
            w.line("modification_time", t.modification_time)?;
            w.line("track_id", t.track_id)?;
            w.line("duration", t.duration)?;
            w.line("layer", t.layer)?;
            w.line("alternate_group", t.alternate_group)?;
            w.line("volume", t.volume)?;
            w.matrix("matrix_structure", &t.matrix)?;
            w.line("track_width", t.width)?;
            w.line("track_height", t.height)
        }
        BoxFields::MediaHeader(m) => {
            w.line("version", m.version)?;
            w.flags(m.flags)?;
            w.line("creation_time", m.creation_time)?;
            w.line("modification_time", m.modification_time)?;
            w.line("time_scale", m.time_scale)?;
            w.line("duration", m.duration)?;
            w.line("language", &m.language)
        }
        BoxFields::HandlerReference(h) => {
            w.line("version", h.version)?;
            w.flags(h.flags)?;
            w.line("handler_type", h.handler_type)?;
            w.line("name", &h.name)
        }
        BoxFields::EditList(e) => {
            w.line("version", e.version)?;
            w.flags(e.flags)?;
            w.line("number_of_entries", e.entries.len())?;
            for (i, entry) in e.entries.iter().enumerate() {
                writeln!(
                    w.out,
                    "{}    [{}] duration={} media_time={} media_rate={}",
                    w.indent, i, entry.segment_duration, entry.media_time, entry.media_rate
                )?;
            }
            Ok(())
        }
    }
}
