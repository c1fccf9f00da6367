//! Metadata kept alongside stored content.
//!
//! The uploader may name the file, with the `X-Filename` header, and declare a MIME type with
//! the `Content-Type` header. Neither is used for addressing. The first upload of some content
//! fixes its metadata. Later uploads of the same content do not change it.
//!
//! A check is performed to validate that the declared value is a valid MIME type string.
//! However, no further check is performed to attempt to verify whether the declared MIME type
//! correctly describes the file contents.
use std::path::Path;
use std::str::FromStr;

use mime::Mime;
use serde::{
    Deserialize,
    Serialize,
};

use log::debug;

const EXT_MAX: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Filename as given by the uploader.
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl FileInfo {

    /// Stored MIME type, or `application/octet-stream`.
    pub fn mime(&self) -> Mime {
        self.content_type.as_ref()
            .and_then(|v| Mime::from_str(v).ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }

    /// Value for the `Content-Disposition` header when serving the content.
    pub fn content_disposition(&self) -> String {
        let m = self.mime();
        let typ = m.type_();
        let disposition = if typ == mime::TEXT || typ == mime::IMAGE {
            "inline"
        } else {
            "attachment"
        };
        if is_header_safe(&self.filename) {
            return format!("{}; filename=\"{}\"", disposition, &self.filename);
        }
        disposition.to_string()
    }
}

fn is_header_safe(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic() || c == ' ') && !s.contains('"') && !s.contains('\\')
}

/// Validate a declared MIME type.
pub fn parse_type(s: &str) -> Option<Mime> {
    match Mime::from_str(s) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("ignoring invalid content type {:?}: {}", s, e);
            None
        },
    }
}

/// Extension of a filename including the leading dot, lowercased.
///
/// Empty if the filename has no extension, or if the extension is not a short run of ASCII
/// alphanumerics.
pub fn ext(filename: &str) -> String {
    let v = match Path::new(filename).extension().and_then(|v| v.to_str()) {
        Some(v) => v,
        None => {
            return String::new();
        },
    };
    if v.is_empty() || v.len() > EXT_MAX || !v.chars().all(|c| c.is_ascii_alphanumeric()) {
        return String::new();
    }
    format!(".{}", v.to_ascii_lowercase())
}


#[cfg(test)]
mod tests {
    use super::{
        ext,
        parse_type,
        FileInfo,
    };

    #[test]
    fn test_ext() {
        assert_eq!(ext("foo.zip"), ".zip");
        assert_eq!(ext("Foo.Tar.GZ"), ".gz");
        assert_eq!(ext("foo"), "");
        assert_eq!(ext(""), "");
        assert_eq!(ext(".bashrc"), "");
        assert_eq!(ext("foo.ba/d"), "");
        assert_eq!(ext("foo.b?d"), "");
        assert_eq!(ext("foo.abcdefghijklmnopq"), "");
    }

    #[test]
    fn test_meta_mime() {
        let mut info = FileInfo::default();
        assert_eq!(info.mime(), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(info.content_disposition(), "attachment");

        info.content_type = Some(parse_type("text/plain").unwrap().to_string());
        info.filename = "foo.txt".to_string();
        assert_eq!(info.mime(), mime::TEXT_PLAIN);
        assert_eq!(info.content_disposition(), "inline; filename=\"foo.txt\"");

        assert!(parse_type("not a type").is_none());
    }

    #[test]
    fn test_meta_filename_unsafe() {
        let info = FileInfo {
            filename: "f\"oo.zip".to_string(),
            content_type: Some("application/zip".to_string()),
        };
        assert_eq!(info.content_disposition(), "attachment");
    }
}
