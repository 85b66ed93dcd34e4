//! Input volumes
//!
//! Input volumes hold data that jobs read at runtime. Files are uploaded
//! directly to object storage through presigned URLs handed out by the API.

use crate::client::{UPLOAD_TIMEOUT, WalkaiClient, ensure_success, read_json};
use crate::error::{ApiError, Result};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An input volume owned by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVolume {
    pub id: u64,
    pub name: String,
    pub size: u64,
    pub key_prefix: Option<String>,
    pub is_input: Option<bool>,
}

/// An object stored in a volume
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeObject {
    pub key: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVolume {
    id: u64,
    #[serde(default)]
    pvc_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    size: u64,
    #[serde(default)]
    key_prefix: Option<String>,
    #[serde(default)]
    is_input: Option<bool>,
}

impl RawVolume {
    fn into_volume(self, api: &str) -> Result<InputVolume> {
        let name = self
            .pvc_name
            .filter(|n| !n.trim().is_empty())
            .or(self.name.filter(|n| !n.trim().is_empty()))
            .ok_or_else(|| ApiError::invalid(format!("{} returned an invalid volume name.", api)))?;

        Ok(InputVolume {
            id: self.id,
            name,
            size: self.size,
            key_prefix: self.key_prefix,
            is_input: self.is_input,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ObjectsResponse {
    #[serde(default)]
    objects: Option<Vec<VolumeObject>>,
}

#[derive(Debug, Deserialize)]
struct CreateVolumeResponse {
    volume: RawVolume,
}

#[derive(Debug, Serialize)]
struct CreateVolumeRequest {
    storage: u32,
}

#[derive(Debug, Serialize)]
struct PresignedRequest<'a> {
    volume_id: u64,
    file_names: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PresignedResponse {
    #[serde(default)]
    presigneds: Option<Vec<String>>,
}

impl WalkaiClient {
    pub async fn list_input_volumes(&self) -> Result<Vec<InputVolume>> {
        const API: &str = "Input volumes API";

        let request = self
            .request(Method::GET, "/volumes/")
            .query(&[("is_input", "true")]);
        let response = self.send(request).await?;
        let response = ensure_success(response, "Failed to list input volumes", None).await?;

        let raw: Vec<RawVolume> = read_json(response, API).await?;
        raw.into_iter().map(|v| v.into_volume(API)).collect()
    }

    pub async fn list_volume_objects(&self, volume_id: u64) -> Result<Vec<VolumeObject>> {
        let response = self
            .send(self.request(Method::GET, &format!("/volumes/{}/objects", volume_id)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!(
                "Volume '{}' was not found.",
                volume_id
            )));
        }
        let response = ensure_success(response, "Failed to list volume objects", None).await?;

        let payload: ObjectsResponse = read_json(response, "Volume objects API").await?;
        Ok(payload.objects.unwrap_or_default())
    }

    /// Create an input volume of `size` storage units
    pub async fn create_input_volume(&self, size: u32) -> Result<InputVolume> {
        const API: &str = "Create input volume API";

        if size == 0 {
            return Err(ApiError::InvalidRequest(
                "Input volume size must be greater than zero.".to_string(),
            ));
        }

        let response = self
            .send(
                self.request(Method::POST, "/volumes/inputs")
                    .json(&CreateVolumeRequest { storage: size }),
            )
            .await?;
        let response = ensure_success(response, "Failed to create input volume", None).await?;

        let payload: CreateVolumeResponse = read_json(response, API).await?;
        let volume = payload.volume.into_volume(API)?;
        tracing::info!("Created input volume {} ({})", volume.id, volume.name);
        Ok(volume)
    }

    /// Ask for one presigned upload URL per file name
    pub async fn request_upload_urls(
        &self,
        volume_id: u64,
        file_names: &[String],
    ) -> Result<Vec<String>> {
        const API: &str = "Request upload URLs API";

        let file_names: Vec<String> = file_names
            .iter()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect();
        if file_names.is_empty() {
            return Err(ApiError::InvalidRequest(
                "At least one file name must be provided.".to_string(),
            ));
        }

        let body = PresignedRequest {
            volume_id,
            file_names: &file_names,
        };
        let response = self
            .send(
                self.request(Method::POST, "/volumes/inputs/presigneds")
                    .json(&body),
            )
            .await?;
        let response = ensure_success(response, "Failed to request upload URLs", None).await?;

        let payload: PresignedResponse = read_json(response, API).await?;
        let urls = payload.presigneds.unwrap_or_default();
        if urls.iter().any(|url| url.trim().is_empty()) {
            return Err(ApiError::invalid(format!(
                "{} returned an invalid presigned URL.",
                API
            )));
        }
        Ok(urls)
    }

    /// PUT each file to its presigned URL, in order
    pub async fn upload_to_presigned(&self, urls: &[String], files: &[PathBuf]) -> Result<()> {
        if urls.len() != files.len() {
            return Err(ApiError::InvalidRequest(
                "The number of presigned URLs does not match the number of files.".to_string(),
            ));
        }

        for (idx, (url, path)) in urls.iter().zip(files).enumerate() {
            let name = display_name(path);
            let content = tokio::fs::read(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ApiError::FileNotFound(path.clone())
                } else {
                    ApiError::Io {
                        path: path.clone(),
                        source: e,
                    }
                }
            })?;

            tracing::debug!("Uploading {} ({} bytes)", name, content.len());
            // Presigned URLs carry their own auth; no bearer token here
            let response = self
                .http
                .put(url)
                .header("Content-Type", "application/octet-stream")
                .timeout(UPLOAD_TIMEOUT)
                .body(content)
                .send()
                .await
                .map_err(|e| ApiError::Upload {
                    name: name.clone(),
                    source: e,
                })?;

            let action = format!("Upload failed for {} (item {})", name, idx + 1);
            ensure_success(response, &action, None).await?;
        }

        Ok(())
    }

    /// Upload local files into an input volume, returning the uploaded names
    pub async fn upload_inputs(&self, volume_id: u64, files: &[PathBuf]) -> Result<Vec<String>> {
        for file in files {
            if file.is_dir() {
                return Err(ApiError::InvalidRequest(format!(
                    "Input path {} is a directory. Directories are not supported; pass the files inside it instead.",
                    file.display()
                )));
            }
            if !file.is_file() {
                return Err(ApiError::FileNotFound(file.clone()));
            }
        }

        let names: Vec<String> = files.iter().map(|f| display_name(f)).collect();
        let urls = self.request_upload_urls(volume_id, &names).await?;
        self.upload_to_presigned(&urls, files).await?;

        tracing::info!("Uploaded {} file(s) to volume {}", names.len(), volume_id);
        Ok(names)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_server::{client, spawn};
    use axum::body::Bytes;
    use axum::extract::{Path as UrlPath, Query};
    use axum::http::HeaderMap;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_upload_rejects_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();

        // 接続前に弾かれるので到達不能なアドレスで良い
        let client = client("http://127.0.0.1:1");
        let err = client.upload_inputs(7, &[data_dir.clone()]).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(err.to_string().contains(&data_dir.display().to_string()));
        assert!(err.to_string().contains("is a directory"));
    }

    #[tokio::test]
    async fn test_list_input_volumes() {
        let router = Router::new().route(
            "/volumes/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("is_input").map(String::as_str), Some("true"));
                Json(json!([
                    {"id": 1, "pvc_name": "input-1", "size": 5},
                    {"id": 2, "name": "input-2", "size": 10},
                ]))
            }),
        );
        let client = client(&spawn(router).await);

        let volumes = client.list_input_volumes().await.unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "input-1");
        assert_eq!(volumes[1].name, "input-2");
        assert_eq!(volumes[1].size, 10);
    }

    #[tokio::test]
    async fn test_list_input_volumes_rejects_nameless_volume() {
        let router = Router::new().route(
            "/volumes/",
            get(|| async { Json(json!([{"id": 1, "size": 5}])) }),
        );
        let client = client(&spawn(router).await);

        let err = client.list_input_volumes().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input volumes API returned an invalid volume name."
        );
    }

    #[tokio::test]
    async fn test_list_volume_objects() {
        let router = Router::new().route(
            "/volumes/{id}/objects",
            get(|UrlPath(id): UrlPath<u64>| async move {
                if id == 7 {
                    (
                        StatusCode::OK,
                        Json(json!({"objects": [
                            {"key": "data/train.csv", "size": 1024, "last_modified": "2024-01-01T00:00:00Z", "etag": "abc"},
                            {"key": "data/empty"},
                        ]})),
                    )
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({})))
                }
            }),
        );
        let client = client(&spawn(router).await);

        let objects = client.list_volume_objects(7).await.unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].size, 1024);
        assert_eq!(objects[0].etag.as_deref(), Some("abc"));
        assert_eq!(objects[1].size, 0);
        assert!(objects[1].last_modified.is_none());

        let err = client.list_volume_objects(8).await.unwrap_err();
        assert_eq!(err.to_string(), "Volume '8' was not found.");
    }

    #[tokio::test]
    async fn test_create_input_volume() {
        let router = Router::new().route(
            "/volumes/inputs",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"storage": 3}));
                (
                    StatusCode::CREATED,
                    Json(json!({"volume": {
                        "id": 11, "pvc_name": "input-11", "size": 3,
                        "key_prefix": "inputs/11/", "is_input": true
                    }})),
                )
            }),
        );
        let client = client(&spawn(router).await);

        let volume = client.create_input_volume(3).await.unwrap();
        assert_eq!(
            volume,
            InputVolume {
                id: 11,
                name: "input-11".to_string(),
                size: 3,
                key_prefix: Some("inputs/11/".to_string()),
                is_input: Some(true),
            }
        );
    }

    #[tokio::test]
    async fn test_create_input_volume_rejects_zero() {
        let client = client("http://127.0.0.1:1");
        let err = client.create_input_volume(0).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input volume size must be greater than zero."
        );
    }

    #[tokio::test]
    async fn test_upload_inputs() {
        let uploads: Arc<Mutex<Vec<(String, String, Vec<u8>)>>> = Arc::default();
        let sink = Arc::clone(&uploads);

        // The presign handler needs the server address, which is only known after bind
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let presign_base = base.clone();

        let router = Router::new()
            .route(
                "/volumes/inputs/presigneds",
                post(move |Json(body): Json<Value>| {
                    let presign_base = presign_base.clone();
                    async move {
                        assert_eq!(body["volume_id"], 5);
                        let urls: Vec<String> = body["file_names"]
                            .as_array()
                            .unwrap()
                            .iter()
                            .map(|n| format!("{}/upload/{}", presign_base, n.as_str().unwrap()))
                            .collect();
                        Json(json!({"presigneds": urls}))
                    }
                }),
            )
            .route(
                "/upload/{name}",
                put(
                    move |UrlPath(name): UrlPath<String>, headers: HeaderMap, body: Bytes| {
                        let sink = Arc::clone(&sink);
                        async move {
                            assert!(headers.get("authorization").is_none());
                            let content_type = headers
                                .get("content-type")
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                                .to_string();
                            sink.lock().unwrap().push((name, content_type, body.to_vec()));
                            StatusCode::OK
                        }
                    },
                ),
            );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let temp_dir = tempfile::tempdir().unwrap();
        let first = temp_dir.path().join("train.csv");
        let second = temp_dir.path().join("labels.json");
        std::fs::write(&first, "a,b\n1,2\n").unwrap();
        std::fs::write(&second, "{}").unwrap();

        let client = client(&base);
        let names = client
            .upload_inputs(5, &[first, second])
            .await
            .unwrap();
        assert_eq!(names, ["train.csv", "labels.json"]);

        let uploads = uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].0, "train.csv");
        assert_eq!(uploads[0].1, "application/octet-stream");
        assert_eq!(uploads[0].2, b"a,b\n1,2\n");
        assert_eq!(uploads[1].0, "labels.json");
    }

    #[tokio::test]
    async fn test_upload_requires_matching_counts() {
        let client = client("http://127.0.0.1:1");
        let err = client
            .upload_to_presigned(&["http://127.0.0.1:1/a".to_string()], &[])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The number of presigned URLs does not match the number of files."
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let client = client("http://127.0.0.1:1");
        let err = client
            .upload_inputs(1, &[PathBuf::from("/nonexistent/walkai/data.csv")])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::FileNotFound(_)));
    }
}
