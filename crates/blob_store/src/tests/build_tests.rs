use super::*;
use chrono::{TimeZone, Utc};

fn item(name: &str, size_bytes: u64, minute: u32) -> BlobItem {
    BlobItem {
        name: name.to_string(),
        size_bytes,
        last_modified: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()),
    }
}

#[test]
fn split_recognizes_each_build_file() {
    assert_eq!(
        split_build_blob("wisetrainer/Plant.framework.js.gz"),
        Some(("wisetrainer/Plant", BuildFile::Framework))
    );
    assert_eq!(
        split_build_blob("Plant.loader.js"),
        Some(("Plant", BuildFile::Loader))
    );
    assert_eq!(split_build_blob("Plant.data.gz"), Some(("Plant", BuildFile::Data)));
    assert_eq!(split_build_blob("Plant.wasm.gz"), Some(("Plant", BuildFile::Wasm)));
    assert_eq!(split_build_blob("Plant.json"), None);
    assert_eq!(split_build_blob(".wasm.gz"), None);
    assert_eq!(split_build_blob("folder/.wasm.gz"), None);
}

#[test]
fn groups_four_files_into_a_complete_build() {
    let items = vec![
        item("wisetrainer/Plant.data.gz", 100, 1),
        item("wisetrainer/Plant.framework.js.gz", 10, 4),
        item("wisetrainer/Plant.loader.js", 1, 2),
        item("wisetrainer/Plant.wasm.gz", 50, 3),
        item("wisetrainer/Other.loader.js", 1, 0),
        item("readme.txt", 5, 0),
    ];
    let builds = group_builds("builds", &items);
    assert_eq!(builds.len(), 2);

    let other = &builds[0];
    assert_eq!(other.build_ref, "builds:wisetrainer/Other");
    assert!(!other.complete);
    assert!(other.files.loader);
    assert!(!other.files.wasm);

    let plant = &builds[1];
    assert_eq!(plant.name, "Plant");
    assert!(plant.complete);
    assert_eq!(plant.total_size_bytes, 161);
    assert_eq!(
        plant.last_modified,
        Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 4, 0).unwrap())
    );
}

#[test]
fn build_refs_round_trip_container_and_path() {
    let build_ref = format_build_ref("builds", "wisetrainer/Plant");
    assert_eq!(build_ref, "builds:wisetrainer/Plant");
    assert_eq!(
        parse_build_ref(&build_ref),
        (Some("builds"), "wisetrainer/Plant")
    );
    assert_eq!(parse_build_ref("Plant"), (None, "Plant"));
    assert_eq!(parse_build_ref(":Plant"), (None, "Plant"));
}

#[test]
fn gzip_files_carry_content_encoding() {
    assert_eq!(
        BuildFile::Wasm.content_headers(),
        BlobContentHeaders::gzip("application/wasm")
    );
    assert_eq!(BuildFile::Loader.content_headers().content_encoding, None);
    assert_eq!(BuildFile::Data.blob_name("x/Plant"), "x/Plant.data.gz");
}
