use crate::boxes::{BoxNode, FourCC};
use std::fmt::Write;

/// Classic 16-bytes-per-row hex dump with an ASCII column.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        let _ = writeln!(out, "{:08x}  {:<48}  |{}|", offs, hexs, ascii);
    }
    out
}

/// Every box in the forest (depth first) whose type is `typ`.
pub fn find_all<'a>(roots: &'a [BoxNode], typ: FourCC) -> Vec<&'a BoxNode> {
    fn walk<'a>(list: &'a [BoxNode], typ: FourCC, out: &mut Vec<&'a BoxNode>) {
        for b in list {
            if b.typ == typ {
                out.push(b);
            }
            walk(&b.children, typ, out);
        }
    }
    let mut out = Vec::new();
    walk(roots, typ, &mut out);
    out
}

/// Select subtrees by a dotted path such as `moov.trak[1].tkhd`.
///
/// A segment without an index matches every sibling of that type; an
/// index picks the n-th match (0-based) under each parent.
pub fn select_by_path<'a>(roots: &'a [BoxNode], path: &str) -> Vec<&'a BoxNode> {
    let mut current: Vec<&'a BoxNode> = Vec::new();

    for (depth, seg) in path.split('.').enumerate() {
        let (name, idx) = parse_segment(seg);
        let Some(fourcc) = FourCC::from_str(name) else {
            return Vec::new();
        };

        let pick = |list: &'a [BoxNode], next: &mut Vec<&'a BoxNode>| {
            let mut matches = list.iter().filter(|b| b.typ == fourcc);
            match idx {
                Some(i) => next.extend(matches.nth(i)),
                None => next.extend(matches),
            }
        };

        let mut next = Vec::new();
        if depth == 0 {
            pick(roots, &mut next);
        } else {
            for &b in &current {
                pick(&b.children, &mut next);
            }
        }

        current = next;
        if current.is_empty() {
            break;
        }
    }

    current
}

fn parse_segment(seg: &str) -> (&str, Option<usize>) {
    match seg.split_once('[') {
        Some((name, rest)) => (name, rest.strip_suffix(']').and_then(|i| i.parse().ok())),
        None => (seg, None),
    }
}
