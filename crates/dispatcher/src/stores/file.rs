//! FileStoreClient - appends wire objects to a JSON lines file

use contracts::{ContractError, Entity, Message, Property, Series, StoreClient};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

/// One line of output
#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    op: &'a str,
    body: &'a T,
}

/// Store client writing one JSON object per wire unit
pub struct FileStoreClient {
    url: Url,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStoreClient {
    /// Open (or create) `path` for appending
    pub fn new(url: Url, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "FileStoreClient opened");

        Ok(Self {
            url,
            path,
            file: Mutex::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(url: Url, params: &HashMap<String, String>) -> std::io::Result<Self> {
        let path = params.get("path").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing 'path' parameter")
        })?;
        Self::new(url, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append<T: Serialize>(&self, op: &str, items: &[T]) -> Result<(), ContractError> {
        let mut buf = Vec::new();
        for body in items {
            serde_json::to_writer(&mut buf, &Record { op, body })
                .map_err(|e| ContractError::store_write(op, format!("json error: {e}")))?;
            buf.push(b'\n');
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| ContractError::store_write(op, "output file lock poisoned"))?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }
}

impl StoreClient for FileStoreClient {
    fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(name = "file_store_update_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn update_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        self.append("entity_update", std::slice::from_ref(entity))
    }

    #[instrument(name = "file_store_create_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn create_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        self.append("entity_create", std::slice::from_ref(entity))
    }

    #[instrument(name = "file_store_insert_properties", skip_all, fields(count = properties.len()))]
    async fn insert_properties(&self, properties: &[Property]) -> Result<(), ContractError> {
        self.append("property", properties)
    }

    #[instrument(name = "file_store_insert_messages", skip_all, fields(count = messages.len()))]
    async fn insert_messages(&self, messages: &[Message]) -> Result<(), ContractError> {
        self.append("message", messages)
    }

    #[instrument(name = "file_store_insert_series", skip_all, fields(count = series.len()))]
    async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError> {
        self.append("series", series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Sample;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_writes_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("store.jsonl");
        let store = FileStoreClient::new("file:///tmp/store".parse().unwrap(), &path).unwrap();

        let series = vec![Series {
            entity: "e1".into(),
            metric: "cpu".into(),
            tags: Default::default(),
            data: vec![Sample { t: 1000, v: 1.5 }],
        }];
        store.insert_series(&series).await.unwrap();
        store.create_entity(&Entity::new("e1")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["op"], "series");
        assert_eq!(lines[0]["body"]["metric"], "cpu");
        assert_eq!(lines[0]["body"]["data"][0]["t"], 1000);
        assert_eq!(lines[1]["op"], "entity_create");
        assert_eq!(lines[1]["body"]["name"], "e1");
    }

    #[test]
    fn test_from_params_requires_path() {
        let result = FileStoreClient::from_params("file:///x".parse().unwrap(), &HashMap::new());
        assert!(result.is_err());
    }
}
