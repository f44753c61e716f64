//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Which blob store holds signature images, seal stamps and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under [`StorageConfig::root_path`].
    #[default]
    Local,
    /// Process-local map, lost on restart.
    Memory,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Blob store implementation.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root path for the local blob store.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum size of an uploaded process document (default 10 MiB).
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    /// Accepted document extensions, lowercase, without the dot.
    #[serde(default = "default_allowed_document_extensions")]
    pub allowed_document_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root_path: default_root_path(),
            max_document_bytes: default_max_document_bytes(),
            allowed_document_extensions: default_allowed_document_extensions(),
        }
    }
}

impl StorageConfig {
    /// Whether `file_name` carries one of the allowed extensions.
    pub fn is_allowed_document(&self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.allowed_document_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    }
}

fn default_root_path() -> String {
    "./data/blobs".to_string()
}

fn default_max_document_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_document_extensions() -> Vec<String> {
    vec!["xls".to_string(), "xlsx".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_extension_check() {
        let config = StorageConfig::default();
        assert!(config.is_allowed_document("mold-42.xlsx"));
        assert!(config.is_allowed_document("MOLD.XLS"));
        assert!(!config.is_allowed_document("setup.pdf"));
        assert!(!config.is_allowed_document("xlsx"));
    }
}
