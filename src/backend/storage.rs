//! Managed object storage for case files
//!
//! Files are uploaded under `<case_id>/<hash prefix>-<file name>` in a public
//! bucket, so the returned URL can be pasted straight into an envelope body.

use super::BackendClient;
use crate::error::{KitError, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// 50 MiB
pub const FILE_SIZE_LIMIT: u64 = 52_428_800;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

#[derive(Debug, Deserialize)]
struct Bucket {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Created,
    Updated,
}

fn bucket_config(bucket: &str) -> serde_json::Value {
    serde_json::json!({
        "id": bucket,
        "name": bucket,
        "public": true,
        "file_size_limit": FILE_SIZE_LIMIT,
        "allowed_mime_types": ALLOWED_MIME_TYPES,
    })
}

/// Create the bucket if it is missing, otherwise make sure it is public with the size limit.
pub async fn ensure_bucket(client: &BackendClient, bucket: &str) -> Result<BucketState> {
    let list_url = format!("{}/storage/v1/bucket", client.base_url());
    let response = client.authed(client.http().get(&list_url)).send().await?;
    if !response.status().is_success() {
        return Err(KitError::from_response(response).await);
    }
    let buckets: Vec<Bucket> = response.json().await?;

    if buckets.iter().any(|b| b.name == bucket || b.id == bucket) {
        let url = format!("{}/storage/v1/bucket/{}", client.base_url(), bucket);
        let response = client
            .authed(client.http().put(url))
            .json(&bucket_config(bucket))
            .send()
            .await?;
        if !response.status().is_success() {
            // The anon role usually may not alter buckets; the bucket is still usable.
            warn!(bucket, status = response.status().as_u16(), "Could not update bucket settings");
        }
        return Ok(BucketState::Updated);
    }

    let response = client
        .authed(client.http().post(&list_url))
        .json(&bucket_config(bucket))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(KitError::from_response(response).await);
    }
    info!(bucket, "Created storage bucket");
    Ok(BucketState::Created)
}

/// Object key for a file: `<case_id>/<first 12 hex chars of sha256>-<sanitized name>`.
pub fn object_path(case_id: &str, file_name: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}/{}-{}", case_id, &digest[..12], name)
}

pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        encoded.join("/")
    )
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Upload a local file for a case and return its public URL.
pub async fn upload_file(
    client: &BackendClient,
    bucket: &str,
    case_id: &str,
    path: &Path,
) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.len() as u64 > FILE_SIZE_LIMIT {
        return Err(KitError::Validation(format!(
            "File is larger than {} MB",
            FILE_SIZE_LIMIT / (1024 * 1024)
        )));
    }
    let content_type = content_type_for(path);
    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(KitError::UnsupportedMedia(content_type.to_string()));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let key = object_path(case_id, file_name, &bytes);
    let url = format!("{}/storage/v1/object/{}/{}", client.base_url(), bucket, key);

    let size = bytes.len();
    let response = client
        .authed(client.http().post(url))
        .header("Content-Type", content_type)
        .header("x-upsert", "true")
        .body(bytes)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(KitError::from_response(response).await);
    }

    info!(bucket, key = %key, size, "Uploaded file");
    Ok(public_url(client.base_url(), bucket, &key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, MockResponse};

    #[test]
    fn test_object_path_is_stable_and_clean() {
        let a = object_path("case-1", "Relatório final.pdf", b"abc");
        let b = object_path("case-1", "Relatório final.pdf", b"abc");
        assert_eq!(a, b);
        // sha256("abc") starts with ba7816bf8f01
        assert_eq!(a, "case-1/ba7816bf8f01-Relat_rio_final.pdf");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://x.example.co/", "case-files", "c1/ab-map.png"),
            "https://x.example.co/storage/v1/object/public/case-files/c1/ab-map.png"
        );
    }

    #[tokio::test]
    async fn test_ensure_bucket_creates_when_missing() {
        let server = serve(vec![
            MockResponse::json(200, r#"[{"id":"avatars","name":"avatars"}]"#),
            MockResponse::json(200, r#"{"name":"case-files"}"#),
        ]);
        let client = BackendClient::new(&server.url, "k");
        let state = ensure_bucket(&client, "case-files").await.unwrap();
        assert_eq!(state, BucketState::Created);

        let reqs = server.requests();
        assert_eq!(reqs[1].method, "POST");
        let body = reqs[1].body_json();
        assert_eq!(body["public"], true);
        assert_eq!(body["file_size_limit"], 52_428_800);
    }

    #[tokio::test]
    async fn test_ensure_bucket_updates_existing() {
        let server = serve(vec![
            MockResponse::json(200, r#"[{"id":"case-files","name":"case-files"}]"#),
            MockResponse::json(403, r#"{"message":"forbidden"}"#),
        ]);
        let client = BackendClient::new(&server.url, "k");
        let state = ensure_bucket(&client, "case-files").await.unwrap();
        assert_eq!(state, BucketState::Updated);
        assert_eq!(server.requests()[1].method, "PUT");
    }

    #[tokio::test]
    async fn test_upload_file_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let server = serve(vec![MockResponse::json(200, r#"{"Key":"case-files/x"}"#)]);
        let client = BackendClient::new(&server.url, "k");
        let url = upload_file(&client, "case-files", "c9", &path).await.unwrap();
        assert!(url.starts_with(&format!("{}/storage/v1/object/public/case-files/c9/", server.url)));
        assert!(url.ends_with("-map.png"));

        let reqs = server.requests();
        assert_eq!(reqs[0].header("x-upsert"), Some("true"));
        assert_eq!(reqs[0].header("Content-Type"), Some("image/png"));
        assert_eq!(reqs[0].body, b"not really a png");
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.exe");
        std::fs::write(&path, b"MZ").unwrap();
        let client = BackendClient::new("http://127.0.0.1:9", "k");
        let err = upload_file(&client, "case-files", "c9", &path).await.unwrap_err();
        assert!(matches!(err, KitError::UnsupportedMedia(_)));
    }
}
