use super::*;

#[tokio::test]
async fn upload_list_and_delete_nested_blobs() {
    let root = tempfile::tempdir().expect("tempdir");
    let store = LocalBlobStore::new(root.path());

    store
        .upload("builds", "wisetrainer/Plant.loader.js", b"loader".to_vec(), BlobContentHeaders::default())
        .await
        .expect("upload");
    store
        .upload("builds", "Root.wasm.gz", b"wasm!".to_vec(), BlobContentHeaders::default())
        .await
        .expect("upload");

    let items = store.list("builds").await.expect("list");
    let names: Vec<_> = items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Root.wasm.gz", "wisetrainer/Plant.loader.js"]);
    assert_eq!(items[0].size_bytes, 5);
    assert!(items[0].last_modified.is_some());

    assert!(store.delete("builds", "Root.wasm.gz").await.expect("delete"));
    assert!(!store.delete("builds", "Root.wasm.gz").await.expect("delete again"));
}

#[tokio::test]
async fn missing_container_lists_empty() {
    let root = tempfile::tempdir().expect("tempdir");
    let store = LocalBlobStore::new(root.path());
    assert!(store.list("nothing").await.expect("list").is_empty());
}

#[tokio::test]
async fn rejects_names_escaping_the_container() {
    let root = tempfile::tempdir().expect("tempdir");
    let store = LocalBlobStore::new(root.path());
    assert!(store
        .upload("builds", "../escape.loader.js", Vec::new(), BlobContentHeaders::default())
        .await
        .is_err());
    assert!(store.delete("../other", "x.wasm.gz").await.is_err());
}
