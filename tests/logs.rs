use std::fs;

// Each integration test binary is its own process, so installing the global
// logger here does not collide with other tests.
#[test]
fn init_writes_to_a_rotating_file() {
    let cache_dir = std::env::temp_dir().join(format!("cyclemap-logs-{}", uuid::Uuid::new_v4()));
    let cache_dir = cache_dir.to_str().unwrap().to_string();

    cyclemap_core::logs::init(&cache_dir).unwrap();
    log::info!("route overlay ready");
    log::logger().flush();

    let contents = fs::read_to_string(format!("{cache_dir}/logs/main.log")).unwrap();
    assert!(contents.contains("route overlay ready"));

    fs::remove_dir_all(&cache_dir).unwrap();
}
