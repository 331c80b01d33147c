use mp4check::parser::parse_boxes;
use serde_json::Value;

fn leaf(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

#[test]
fn tree_serializes_with_typed_fields() {
    // [ftyp] [moov [edts [elst]]] [mdat]
    let mut ftyp = b"isom".to_vec();
    ftyp.extend_from_slice(&512u32.to_be_bytes());
    ftyp.extend_from_slice(b"isom");

    let mut elst = vec![0, 0, 0, 0, 0, 0, 0, 1];
    elst.extend_from_slice(&100u32.to_be_bytes());
    elst.extend_from_slice(&0u32.to_be_bytes());
    elst.extend_from_slice(&0x0001_8000u32.to_be_bytes());

    let mut data = leaf(b"ftyp", &ftyp);
    data.extend(leaf(b"moov", &leaf(b"edts", &leaf(b"elst", &elst))));
    data.extend(leaf(b"mdat", &[0u8; 8]));

    let boxes = parse_boxes(&data[..]).into_result().unwrap();
    let v: Value = serde_json::to_value(&boxes).expect("serialize");
    let arr = v.as_array().expect("top-level array");
    assert_eq!(arr.len(), 3);

    assert_eq!(arr[0]["type"], "ftyp");
    assert_eq!(arr[0]["size"], 24);
    assert_eq!(arr[0]["fields"]["kind"], "file_type");
    assert_eq!(arr[0]["fields"]["major_brand"], "isom");
    assert_eq!(arr[0]["fields"]["compatible_brands"][0], "isom");

    let elst = &arr[1]["children"][0]["children"][0];
    assert_eq!(elst["type"], "elst");
    assert_eq!(elst["fields"]["kind"], "edit_list");
    assert_eq!(elst["fields"]["entries"][0]["segment_duration"], 100);
    assert_eq!(elst["fields"]["entries"][0]["media_rate"], 1.5);

    // unknown boxes carry no fields and no children
    assert_eq!(arr[2]["type"], "mdat");
    assert!(arr[2].get("fields").is_none());
    assert!(arr[2].get("children").is_none());
    assert_eq!(arr[2]["offset"], 24 + 44);
}
