use mp4check::boxes::FourCC;
use mp4check::parser::parse_boxes;
use mp4check::util::{find_all, select_by_path};

fn leaf(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn two_track_movie() -> Vec<u8> {
    let trak_a = leaf(b"trak", &leaf(b"edts", &[]));
    let trak_b = leaf(b"trak", &[leaf(b"edts", &[]), leaf(b"udta", &[1, 2])].concat());
    leaf(b"moov", &[trak_a, trak_b].concat())
}

#[test]
fn select_by_index_and_by_type() {
    let data = two_track_movie();
    let boxes = parse_boxes(&data[..]).into_result().unwrap();

    let all = select_by_path(&boxes, "moov.trak");
    assert_eq!(all.len(), 2);

    let second = select_by_path(&boxes, "moov.trak[1].udta");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].size, 10);

    assert!(select_by_path(&boxes, "moov.trak[2]").is_empty());
    assert!(select_by_path(&boxes, "moov.toolong").is_empty());
}

#[test]
fn find_all_walks_depth_first() {
    let data = two_track_movie();
    let boxes = parse_boxes(&data[..]).into_result().unwrap();
    let edts = find_all(&boxes, FourCC(*b"edts"));
    assert_eq!(edts.len(), 2);
    assert!(edts[0].offset < edts[1].offset);
}
