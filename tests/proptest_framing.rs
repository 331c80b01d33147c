//! Property-based tests for box framing.
//!
//! Any well-formed sequence of boxes must parse back to the same sizes and
//! tags and re-serialize byte-for-byte, whether or not the types are known.

use mp4check::parser::{BoxReader, ParseOptions};
use mp4check::registry::default_registry;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Tree {
    Leaf([u8; 4], Vec<u8>),
    Node([u8; 4], Vec<Tree>),
}

impl Tree {
    fn encode(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&[0; 4]);
        match self {
            Tree::Leaf(typ, payload) => {
                out.extend_from_slice(typ);
                out.extend_from_slice(payload);
            }
            Tree::Node(typ, kids) => {
                out.extend_from_slice(typ);
                for k in kids {
                    k.encode(out);
                }
            }
        }
        let size = (out.len() - start) as u32;
        out[start..start + 4].copy_from_slice(&size.to_be_bytes());
    }
}

// lowercase tags outside the registry, so leaves are always skipped generically
fn arb_tag() -> impl Strategy<Value = [u8; 4]> {
    prop::array::uniform4(b'q'..=b'z')
}

fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = (arb_tag(), prop::collection::vec(any::<u8>(), 0..40))
        .prop_map(|(t, p)| Tree::Leaf(t, p));
    leaf.prop_recursive(4, 32, 4, |inner| {
        (
            prop_oneof![Just(*b"moov"), Just(*b"trak"), Just(*b"edts"), Just(*b"mdia")],
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(t, kids)| Tree::Node(t, kids))
    })
}

proptest! {
    #[test]
    fn framing_round_trips(trees in prop::collection::vec(arb_tree(), 0..5)) {
        let mut data = Vec::new();
        for t in &trees {
            t.encode(&mut data);
        }

        let options = ParseOptions { keep_payload: true, ..ParseOptions::default() };
        let boxes = BoxReader::new(default_registry())
            .with_options(options)
            .parse_strict(&data[..])
            .unwrap();

        prop_assert_eq!(boxes.len(), trees.len());

        let mut offset = 0u64;
        let mut rebuilt = Vec::new();
        for b in &boxes {
            prop_assert_eq!(b.offset, offset);
            offset += b.size as u64;
            rebuilt.extend(b.to_bytes().unwrap());
        }
        prop_assert_eq!(offset, data.len() as u64);
        prop_assert_eq!(rebuilt, data);
    }

    #[test]
    fn truncated_input_never_yields_a_partial_root(
        trees in prop::collection::vec(arb_tree(), 1..4),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut data = Vec::new();
        let mut ends = Vec::new();
        for t in &trees {
            t.encode(&mut data);
            ends.push(data.len());
        }
        let cut = cut.index(data.len());

        let outcome = BoxReader::new(default_registry()).parse(&data[..cut]);
        let complete = ends.iter().filter(|&&e| e <= cut).count();
        prop_assert_eq!(outcome.boxes.len(), complete);
        prop_assert_eq!(outcome.error.is_none(), ends.contains(&cut) || cut == 0);
    }
}
