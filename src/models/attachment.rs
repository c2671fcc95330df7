use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::Deserializer;
use serde::ser::{Error as _, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// A file picked on disk that has not been uploaded yet
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl LocalFile {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: metadata.len(),
        })
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Mime type sent with the multipart upload.
    pub fn mime_type(&self) -> mime::Mime {
        match self.extension().as_deref() {
            Some("pdf") => mime::APPLICATION_PDF,
            Some("png") => mime::IMAGE_PNG,
            Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
            _ => mime::APPLICATION_OCTET_STREAM,
        }
    }

    /// Problems that would make the backend reject this file.
    pub fn problem(&self) -> Option<String> {
        let allowed = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        if !allowed {
            return Some(format!(
                "{} must be one of: {}",
                self.file_name,
                ALLOWED_EXTENSIONS.join(", ")
            ));
        }
        if self.size > MAX_ATTACHMENT_BYTES {
            return Some(format!("{} is larger than 5 MB", self.file_name));
        }
        None
    }
}

/// File descriptor returned by the server after upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub file_name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Local(LocalFile),
    Stored(StoredFile),
}

impl Attachment {
    #[cfg(test)]
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Attachment::Stored(_))
    }

    #[cfg(test)]
    pub fn file_name(&self) -> &str {
        match self {
            Attachment::Local(file) => &file.file_name,
            Attachment::Stored(file) => &file.file_name,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Attachment::Local(file) => format!("{} (pending upload)", file.file_name),
            Attachment::Stored(file) => format!("{} [{}]", file.file_name, file.file_path),
        }
    }
}

/// Serialize attachments as server descriptors. Pending files are an error.
pub fn serialize_uploaded<S>(items: &[Attachment], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        match item {
            Attachment::Stored(file) => seq.serialize_element(file)?,
            Attachment::Local(file) => {
                return Err(S::Error::custom(format!(
                    "attachment {} has not been uploaded",
                    file.file_name
                )));
            }
        }
    }
    seq.end()
}

/// Deserialize server descriptors; `null` or a missing field becomes an empty list.
pub fn deserialize_stored<'de, D>(deserializer: D) -> Result<Vec<Attachment>, D::Error>
where
    D: Deserializer<'de>,
{
    let files = Option::<Vec<StoredFile>>::deserialize(deserializer)?;
    Ok(files
        .unwrap_or_default()
        .into_iter()
        .map(Attachment::Stored)
        .collect())
}
