use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn memory_pool_never_reaps_its_only_connection() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let options = storage.pool().options();

    assert_eq!(options.get_max_connections(), 1);
    assert_eq!(options.get_min_connections(), 1);
    assert_eq!(options.get_idle_timeout(), None);
    assert_eq!(options.get_max_lifetime(), None);
    assert_eq!(storage.pool().size(), 1);
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn upsert_user_is_keyed_by_email() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .upsert_user("alice@example.com", None)
        .await
        .expect("user");
    let second = storage
        .upsert_user("alice@example.com", Some("Alice"))
        .await
        .expect("user");
    assert_eq!(first, second);

    let third = storage
        .upsert_user("alice@example.com", None)
        .await
        .expect("user");
    assert_eq!(first, third);

    let user = storage.get_user(first).await.expect("load").expect("exists");
    assert_eq!(user.name.as_deref(), Some("Alice"));
}

#[test]
fn sqlite_path_ignores_memory_and_query_string() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/app.db?mode=rwc"),
        Some(PathBuf::from("./data/app.db"))
    );
}
