use crate::entities::attachments;
use crate::utils::naming::normalize_type;
use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Anything that can own attachments: identified by a kind name and a key.
pub trait Owner {
    fn owner_kind(&self) -> &str;
    fn owner_key(&self) -> String;

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(self.owner_kind(), self.owner_key())
    }
}

/// Polymorphic owner reference as stored on attachment rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: String,
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, id: impl ToString) -> Self {
        Self {
            kind: kind.into(),
            id: id.to_string(),
        }
    }
}

impl Owner for OwnerRef {
    fn owner_kind(&self) -> &str {
        &self.kind
    }

    fn owner_key(&self) -> String {
        self.id.clone()
    }

    fn owner_ref(&self) -> OwnerRef {
        self.clone()
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Which type tags a query selects. Untyped rows and typed rows never mix
/// unless `Any` is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    Untyped,
    Tags(Vec<String>),
}

impl TypeFilter {
    /// A single optional tag: `None` or a blank tag selects untyped rows.
    pub fn of(tag: Option<&str>) -> Self {
        match normalize_type(tag) {
            Some(tag) => TypeFilter::Tags(vec![tag]),
            None => TypeFilter::Untyped,
        }
    }

    /// Several tags; blank entries are dropped and an empty set means untyped.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = tags
            .into_iter()
            .filter_map(|t| normalize_type(Some(t.as_ref())))
            .collect();
        normalized.sort();
        normalized.dedup();
        if normalized.is_empty() {
            TypeFilter::Untyped
        } else {
            TypeFilter::Tags(normalized)
        }
    }
}

/// Raw file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub original_name: String,
    pub mime_type: String,
    pub data: Bytes,
    /// False when the source was received but is malformed or truncated.
    pub valid: bool,
}

impl UploadPayload {
    pub fn new(original_name: impl Into<String>, mime_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        let original_name = original_name.into();
        let data = data.into();
        let mime_type = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(declared) => declared.to_string(),
            None => detect_mime_type(&original_name, &data),
        };

        Self {
            original_name,
            mime_type,
            data,
            valid: true,
        }
    }

    /// A payload whose transfer did not complete; always rejected.
    pub fn malformed(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime::APPLICATION_OCTET_STREAM.to_string(),
            data: Bytes::new(),
            valid: false,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::new(name, None, data))
    }

    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Magic bytes first, then the extension, then `application/octet-stream`.
pub fn detect_mime_type(filename: &str, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let guessed = match ext.as_deref() {
        Some("txt") => Some(mime::TEXT_PLAIN),
        Some("csv") => Some(mime::TEXT_CSV),
        Some("html") | Some("htm") => Some(mime::TEXT_HTML),
        Some("json") => Some(mime::APPLICATION_JSON),
        Some("pdf") => Some(mime::APPLICATION_PDF),
        Some("jpg") | Some("jpeg") => Some(mime::IMAGE_JPEG),
        Some("png") => Some(mime::IMAGE_PNG),
        Some("gif") => Some(mime::IMAGE_GIF),
        Some("svg") => Some(mime::IMAGE_SVG),
        _ => None,
    };

    guessed
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
        .essence_str()
        .to_string()
}

/// External representation of an attachment. Owner linkage is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentView {
    pub id: String,
    pub name: String,
    pub mimetype: String,
    pub path: String,
    pub url: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttachmentView {
    pub fn from_model(model: &attachments::Model, url: String) -> Self {
        Self {
            id: model.id.clone(),
            name: model.original_name.clone(),
            mimetype: model.mime_type.clone(),
            path: model.storage_path.clone(),
            url,
            size: model.size_bytes,
            tag: model.tag.clone(),
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_filter_normalizes() {
        assert_eq!(TypeFilter::of(None), TypeFilter::Untyped);
        assert_eq!(TypeFilter::of(Some("  ")), TypeFilter::Untyped);
        assert_eq!(
            TypeFilter::of(Some("Photo")),
            TypeFilter::Tags(vec!["photo".to_string()])
        );
        assert_eq!(
            TypeFilter::tags(["photo", "", "Selfie"]),
            TypeFilter::Tags(vec!["photo".to_string(), "selfie".to_string()])
        );
        assert_eq!(TypeFilter::tags(Vec::<String>::new()), TypeFilter::Untyped);
    }

    #[test]
    fn test_type_filter_drops_scattered_duplicates() {
        assert_eq!(
            TypeFilter::tags(["photo", "selfie", "Photo", "selfie"]),
            TypeFilter::Tags(vec!["photo".to_string(), "selfie".to_string()])
        );
    }

    #[test]
    fn test_payload_mime_detection() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let payload = UploadPayload::new("avatar", None, png.to_vec());
        assert_eq!(payload.mime_type, "image/png");

        let payload = UploadPayload::new("notes.txt", None, b"plain words".to_vec());
        assert_eq!(payload.mime_type, "text/plain");

        let payload = UploadPayload::new("blob", Some("application/x-custom"), b"??".to_vec());
        assert_eq!(payload.mime_type, "application/x-custom");
        assert_eq!(payload.size(), 2);
        assert!(payload.is_valid());
    }

    #[test]
    fn test_malformed_payload() {
        let payload = UploadPayload::malformed("broken.jpg");
        assert!(!payload.is_valid());
        assert_eq!(payload.size(), 0);
    }

    #[test]
    fn test_view_hides_owner() {
        let now = Utc::now();
        let model = attachments::Model {
            id: "a1".into(),
            owner_kind: "user".into(),
            owner_id: "42".into(),
            tag: Some("photo".into()),
            storage_path: "user/abc.jpg".into(),
            original_name: "photo.jpg".into(),
            mime_type: "image/jpeg".into(),
            size_bytes: 10,
            created_at: now,
            updated_at: now,
        };

        let view = AttachmentView::from_model(&model, "/storage/user/abc.jpg".into());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "photo");
        assert_eq!(json["name"], "photo.jpg");
        assert!(json.get("owner_id").is_none());

        let raw = serde_json::to_value(&model).unwrap();
        assert!(raw.get("owner_kind").is_none());
        assert!(raw.get("owner_id").is_none());
        assert_eq!(raw["type"], "photo");
        assert!(model.is_image());
    }

    #[test]
    fn test_owner_ref_display() {
        let owner = OwnerRef::new("User", 7);
        assert_eq!(owner.to_string(), "User#7");
        assert_eq!(owner.owner_key(), "7");
    }
}
