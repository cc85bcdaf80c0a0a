// tests/fingerprint_hashing.rs

use std::collections::HashSet;
use std::path::Path;

use proptest::prelude::*;

use cvsync::fs::mock::MockFileSystem;
use cvsync::sync::{fingerprint_bytes, fingerprint_file};
use cvsync_test_utils::init_tracing;

#[test]
fn bytes_hash_is_stable_hex() {
    init_tracing();

    let hash = fingerprint_bytes(b"curriculum vitae");
    assert_eq!(hash, fingerprint_bytes(b"curriculum vitae"));
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn distinct_payloads_produce_distinct_hashes() {
    init_tracing();

    let mut hashes = HashSet::new();
    for i in 0..1000 {
        let payload = format!("resume-{i}-{}", "x".repeat(i % 80));
        hashes.insert(fingerprint_bytes(payload.as_bytes()));
    }
    assert_eq!(hashes.len(), 1000);
}

#[test]
fn file_hash_matches_bytes_hash_for_large_content() {
    init_tracing();

    // Larger than one read chunk, so the streaming path is exercised.
    let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    let fs = MockFileSystem::new();
    fs.add_file("/inbox/big.pdf", content.clone());

    let on_disk = fingerprint_file(&fs, Path::new("/inbox/big.pdf")).unwrap();
    assert_eq!(on_disk, fingerprint_bytes(&content));
}

#[test]
fn missing_file_is_an_error() {
    init_tracing();

    let fs = MockFileSystem::new();
    assert!(fingerprint_file(&fs, Path::new("/inbox/nope.pdf")).is_err());
}

proptest! {
    #[test]
    fn hashing_is_deterministic_and_path_independent(
        data in proptest::collection::vec(any::<u8>(), 0..4096)
    ) {
        prop_assert_eq!(fingerprint_bytes(&data), fingerprint_bytes(&data));

        let fs = MockFileSystem::new();
        fs.add_file("/a/blob.pdf", data.clone());
        fs.add_file("/b/copy.pdf", data.clone());

        let first = fingerprint_file(&fs, Path::new("/a/blob.pdf")).unwrap();
        let second = fingerprint_file(&fs, Path::new("/b/copy.pdf")).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, fingerprint_bytes(&data));
    }
}
