//! Integration tests for the JSON export writer.

#[path = "common/fixtures.rs"]
mod fixtures;

use camino::Utf8PathBuf;
use fixtures::{CIDR_BLOCK, OWNER_ID, REGION, VPC_ID, route_table, subnet, vpc};
use mezha::test_support::{FakeCloudApi, sample_config};
use mezha::{MezhaConfig, VpcSession};
use tempfile::TempDir;

const EXPORT_KEYS: [&str; 9] = [
    "cidr_block",
    "config",
    "dry_run",
    "owner_id",
    "peering_connections",
    "region",
    "route_tables",
    "subnets",
    "vpc_id",
];

fn temp_log_dir(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().join("exports"))
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()))
}

async fn session_exporting_to(log_path: Utf8PathBuf) -> VpcSession<FakeCloudApi> {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_route_tables(vec![route_table("rtb-1", "10.0.0.0/16")]);
    api.seed_subnets(vec![subnet("subnet-1", "10.0.1.0/24")]);
    let config = MezhaConfig {
        log_path,
        ..sample_config()
    };
    VpcSession::connect(api, config, REGION, VPC_ID, vec![String::from("i-1")])
        .await
        .unwrap_or_else(|err| panic!("session should connect: {err}"))
}

fn read_export(path: &Utf8PathBuf) -> (String, serde_json::Value) {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("export should be readable: {err}"));
    let value = serde_json::from_str(&text)
        .unwrap_or_else(|err| panic!("export should be valid JSON: {err}"));
    (text, value)
}

#[tokio::test]
async fn extension_is_appended_exactly_once() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let session = session_exporting_to(temp_log_dir(&tmp)).await;

    let bare = session
        .export_to_file("state")
        .unwrap_or_else(|err| panic!("export should succeed: {err}"));
    let suffixed = session
        .export_to_file("state.json")
        .unwrap_or_else(|err| panic!("export should succeed: {err}"));

    assert_eq!(bare, suffixed);
    assert!(bare.as_str().ends_with("state.json"));
}

#[tokio::test]
async fn reexport_overwrites_the_previous_file() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let session = session_exporting_to(temp_log_dir(&tmp)).await;

    let path = session
        .export_to_file("state")
        .unwrap_or_else(|err| panic!("first export should succeed: {err}"));
    let (first_text, _) = read_export(&path);

    session
        .export_to_file("state")
        .unwrap_or_else(|err| panic!("second export should succeed: {err}"));
    let (second_text, second_value) = read_export(&path);

    assert_eq!(first_text, second_text, "same state renders identically");
    assert!(second_value.is_object());
}

#[tokio::test]
async fn document_has_exactly_the_fixed_key_set_sorted() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let session = session_exporting_to(temp_log_dir(&tmp)).await;

    let path = session
        .export_to_file("state")
        .unwrap_or_else(|err| panic!("export should succeed: {err}"));
    let (text, value) = read_export(&path);

    let object = value
        .as_object()
        .unwrap_or_else(|| panic!("export root should be an object"));
    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    assert_eq!(keys, EXPORT_KEYS);

    let mut last_position = 0;
    for key in EXPORT_KEYS {
        let needle = format!("\"{key}\"");
        let position = text
            .find(&needle)
            .unwrap_or_else(|| panic!("{key} should appear in the document"));
        assert!(
            position >= last_position,
            "{key} is out of lexicographic order in the file"
        );
        last_position = position;
    }
    assert!(
        text.contains("    \"cidr_block\""),
        "document should be indented with four spaces"
    );
}

#[tokio::test]
async fn document_reflects_session_identity_and_redacts_secrets() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let session = session_exporting_to(temp_log_dir(&tmp)).await;

    let document = session
        .export_document()
        .unwrap_or_else(|err| panic!("document should render: {err}"));

    assert_eq!(document.get("region"), Some(&serde_json::json!(REGION)));
    assert_eq!(document.get("vpc_id"), Some(&serde_json::json!(VPC_ID)));
    assert_eq!(document.get("owner_id"), Some(&serde_json::json!(OWNER_ID)));
    assert_eq!(
        document.get("cidr_block"),
        Some(&serde_json::json!(CIDR_BLOCK))
    );
    assert_eq!(document.get("dry_run"), Some(&serde_json::json!(false)));

    let config = document
        .get("config")
        .and_then(serde_json::Value::as_object)
        .unwrap_or_else(|| panic!("config should be an object"));
    assert!(config.contains_key("access_key"));
    assert!(!config.contains_key("secret_key"));

    let tables = document
        .get("route_tables")
        .and_then(serde_json::Value::as_object)
        .unwrap_or_else(|| panic!("route_tables should be an object"));
    assert!(tables.contains_key("rtb-1"));
}

#[tokio::test]
async fn export_creates_the_missing_directory() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let log_dir = temp_log_dir(&tmp).join("nested").join("deeper");
    let session = session_exporting_to(log_dir.clone()).await;

    let path = session
        .export_to_file("state")
        .unwrap_or_else(|err| panic!("export should succeed: {err}"));
    assert!(path.as_str().starts_with(log_dir.as_str()));
    assert!(std::fs::metadata(&path).is_ok(), "file should exist on disk");
}
