use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::fs;
use std::path::Path;

/// Local filesystem storage; relative paths resolve against `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
        let full_dir = Path::new(&self.base_path).join(dir);
        if !full_dir.is_dir() {
            return Err(EtlError::SourceNotFound {
                path: dir.to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&full_dir)? {
            let path = entry?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(Path::new(dir).join(name).to_string_lossy().into_owned());
                }
            }
        }
        Ok(files)
    }
}
