//! Archive codec integration tests: round trip, determinism and corruption

mod common;

use common::{TestEnv, store_with};
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use graphpack::bundle::{ArchiveContents, archive, pack, read_manifest, unpack};
use graphpack::error::GraphpackError;
use graphpack::hash;

fn installed_dir(env: &TestEnv) -> std::path::PathBuf {
    env.write_file("docs/notes.txt", "notes\n");
    env.write_file("data/table.csv", "a,b\n1,2\n");
    let report = env.install(
        &env.cache(),
        r#"
id: ex/a
version: 2
description: Round trip
includes: ["http://example.org/one", "http://example.org/two"]
files:
  includes: [docs/notes.txt]
  patterns: ["data/*.csv"]
"#,
        &store_with(&[
            ("http://example.org/one", "http://example.org/s1"),
            ("http://example.org/two", "http://example.org/s2"),
        ]),
    );
    report.bundle.path
}

fn tree_hashes(dir: &std::path::Path) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().to_string();
            (rel, hash::hash_file(e.path()).unwrap())
        })
        .collect();
    out.sort();
    out
}

#[test]
fn test_unpack_of_pack_is_identical() {
    let env = TestEnv::new();
    let dir = installed_dir(&env);

    let bytes = pack(&dir).unwrap();
    let target = env.temp.path().join("unpacked");
    let manifest = unpack(&bytes, &target).unwrap();

    assert_eq!(manifest.key().to_string(), "ex/a@2");
    assert_eq!(tree_hashes(&dir), tree_hashes(&target));
}

#[test]
fn test_pack_is_deterministic_across_copies() {
    let env = TestEnv::new();
    let dir = installed_dir(&env);
    let first = pack(&dir).unwrap();

    // Same content installed into a different cache at a later time
    let other = env.other_cache("elsewhere");
    other.install_archive(&first).unwrap();
    let second = pack(&other.bundle_path("ex/a", 2)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_read_manifest_without_unpacking() {
    let env = TestEnv::new();
    let bytes = pack(&installed_dir(&env)).unwrap();
    let manifest = read_manifest(&bytes).unwrap();
    assert_eq!(manifest.contexts.len(), 2);
    assert_eq!(manifest.files.len(), 2);
    assert_eq!(manifest.description.as_deref(), Some("Round trip"));
}

#[test]
fn test_tampered_content_is_corrupt() {
    let env = TestEnv::new();
    let dir = installed_dir(&env);
    std::fs::write(dir.join("files/docs/notes.txt"), "changed\n").unwrap();

    assert!(matches!(
        pack(&dir),
        Err(GraphpackError::ArchiveCorrupt { .. })
    ));
}

#[test]
fn test_truncated_archive_is_rejected() {
    let env = TestEnv::new();
    let bytes = pack(&installed_dir(&env)).unwrap();
    let truncated = &bytes[..bytes.len() / 2];

    let target = env.temp.path().join("never");
    assert!(unpack(truncated, &target).is_err());
    assert!(!target.exists());
}

#[test]
fn test_archive_file_name_is_sanitized() {
    assert_eq!(archive::archive_file_name("ex/a"), "ex-a.tar.gz");
}

#[test]
fn test_altered_manifest_hash_is_corrupt() {
    let env = TestEnv::new();
    let bytes = pack(&installed_dir(&env)).unwrap();

    let mut tar = Vec::new();
    GzDecoder::new(bytes.as_slice()).read_to_end(&mut tar).unwrap();
    let marker = b"\"content_hash\": \"blake3:";
    let at = tar
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("manifest content hash")
        + marker.len();
    tar[at] = if tar[at] == b'0' { b'1' } else { b'0' };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    let altered = encoder.finish().unwrap();

    assert!(matches!(
        ArchiveContents::read(&altered),
        Err(GraphpackError::ArchiveCorrupt { .. })
    ));
    let target = env.temp.path().join("never");
    assert!(unpack(&altered, &target).is_err());
    assert!(!target.exists());
}
