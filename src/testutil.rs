//! Shared helpers for in-crate tests.

use crate::client::DiffioClient;
use crate::transport::MockTransport;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn test_client(mock: Arc<MockTransport>) -> DiffioClient {
    DiffioClient::builder()
        .api_key("test-key")
        .base_url("http://api.local")
        .transport(mock)
        .build()
        .unwrap()
}

pub(crate) fn write_temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("diffio-test-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}
