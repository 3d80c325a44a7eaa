use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Metadata row for one stored file. The `bucket_file_id` points at the
/// underlying storage object; the two are created and destroyed as a pair.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub extension: String,
    pub size: u64,
    pub url: String,
    pub owner: String,
    pub owner_name: String,
    pub account_id: String,
    /// Emails of additional users granted access.
    pub users: Vec<String>,
    pub bucket_file_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Document,
    Image,
    Video,
    Audio,
    Other,
}

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "xls", "xlsx", "csv", "rtf", "ods", "ppt", "odp", "md", "html",
    "htm", "epub", "pages", "fig", "psd", "ai", "indd", "xd", "sketch", "afdesign", "afphoto",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

/// Classifies a file name into `(category, extension)`. Names without an
/// extension land in `Other` with an empty extension.
pub fn file_kind(name: &str) -> (FileKind, String) {
    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return (FileKind::Other, String::new()),
    };
    let kind = if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Document
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Image
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Video
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Audio
    } else {
        FileKind::Other
    };
    (kind, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_extensions() {
        assert_eq!(file_kind("report.pdf"), (FileKind::Document, "pdf".into()));
        assert_eq!(file_kind("photo.JPEG"), (FileKind::Image, "jpeg".into()));
        assert_eq!(file_kind("clip.mkv"), (FileKind::Video, "mkv".into()));
        assert_eq!(file_kind("song.flac"), (FileKind::Audio, "flac".into()));
        assert_eq!(file_kind("data.bin"), (FileKind::Other, "bin".into()));
    }

    #[test]
    fn extensionless_names_are_other() {
        assert_eq!(file_kind("README"), (FileKind::Other, String::new()));
        assert_eq!(file_kind(".gitignore"), (FileKind::Other, String::new()));
        assert_eq!(file_kind("archive."), (FileKind::Other, String::new()));
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let row = FileRow {
            id: "f1".into(),
            name: "report.pdf".into(),
            kind: FileKind::Document,
            extension: "pdf".into(),
            size: 42,
            url: "https://example.com/f1".into(),
            owner: "u1".into(),
            owner_name: "Ada".into(),
            account_id: "a1".into(),
            users: vec![],
            bucket_file_id: "obj1".into(),
            created_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["type"], "document");
    }
}
