use spotnow::management::{FileTokenCache, TokenCache};
use tempfile::TempDir;

fn cache_in(dir: &TempDir) -> FileTokenCache {
    FileTokenCache::new(dir.path().join("cache").join("token.json"))
}

#[tokio::test]
async fn test_load_missing_is_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(cache_in(&dir).load().await, None);
}

#[tokio::test]
async fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);

    cache.save("RT1").await.unwrap();
    assert_eq!(cache.load().await.as_deref(), Some("RT1"));

    cache.save("RT2").await.unwrap();
    assert_eq!(cache.load().await.as_deref(), Some("RT2"));
}

#[tokio::test]
async fn test_saved_record_holds_only_refresh_token() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    cache.save("RT1").await.unwrap();

    let raw = std::fs::read_to_string(cache.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({ "refresh_token": "RT1" }));
}

#[tokio::test]
async fn test_save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    cache.save("RT1").await.unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path().join("cache"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("token.json")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_saved_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    cache.save("RT1").await.unwrap();

    let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_corrupt_file_is_absence() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();

    std::fs::write(cache.path(), "{\"refresh_tok").unwrap();
    assert_eq!(cache.load().await, None);

    std::fs::write(cache.path(), "{\"refresh_token\": \"\"}").unwrap();
    assert_eq!(cache.load().await, None);

    std::fs::write(cache.path(), [0xff, 0xfe, 0x00]).unwrap();
    assert_eq!(cache.load().await, None);
}

#[tokio::test]
async fn test_save_overwrites_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
    std::fs::write(cache.path(), "garbage").unwrap();

    cache.save("RT1").await.unwrap();
    assert_eq!(cache.load().await.as_deref(), Some("RT1"));
}

#[tokio::test]
async fn test_clear() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    cache.save("RT1").await.unwrap();

    cache.clear().await.unwrap();
    assert_eq!(cache.load().await, None);
    assert!(!cache.path().exists());

    // Clearing an empty cache is fine
    cache.clear().await.unwrap();
}
