use std::path::PathBuf;
use std::process::{Command, Output};

fn mp4check(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mp4check"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mp4check")
}

fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mp4check-{}-{}", std::process::id(), name));
    std::fs::write(&path, bytes).unwrap();
    path
}

fn ftyp() -> Vec<u8> {
    let mut v = 20u32.to_be_bytes().to_vec();
    v.extend_from_slice(b"ftypisom");
    v.extend_from_slice(&0x200u32.to_be_bytes());
    v.extend_from_slice(b"mp41");
    v
}

#[test]
fn help_flag_prints_usage_and_fails() {
    let out = mp4check(&["-h"]);
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage"));
}

#[test]
fn missing_path_fails() {
    let out = mp4check(&[]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn unopenable_file_fails_without_output() {
    let path = std::env::temp_dir().join("mp4check-no-such-input.mp4");
    let _ = std::fs::remove_file(&path);
    let out = mp4check(&[path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn report_for_a_readable_file() {
    let path = temp_file("ftyp.mp4", &ftyp());
    let out = mp4check(&[path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);

    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.starts_with("type: ftyp\nsize: 20\nmajor_brand: isom\n"));
    assert!(text.contains("compatible_brands: [mp41]"));
}

#[test]
fn filter_output_starts_at_the_left_margin() {
    let mut edts = 8u32.to_be_bytes().to_vec();
    edts.extend_from_slice(b"edts");
    let mut trak = 16u32.to_be_bytes().to_vec();
    trak.extend_from_slice(b"trak");
    trak.extend(edts);
    let mut moov = 24u32.to_be_bytes().to_vec();
    moov.extend_from_slice(b"moov");
    moov.extend(trak);

    let path = temp_file("filter.mp4", &moov);
    let out = mp4check(&[path.to_str().unwrap(), "--filter", "moov.trak.edts"]);
    let _ = std::fs::remove_file(&path);

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "type: edts\nsize: 8\n\n");
}
