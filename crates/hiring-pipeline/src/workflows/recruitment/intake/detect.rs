use std::io::Cursor;

use mime::Mime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::super::error::RecruitmentError;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const WORD_MAIN_PART: &str = "word/document.xml";
const SNIFF_WINDOW: usize = 1024;

/// Document families the extractor can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Pdf,
    WordProcessing,
}

impl MediaKind {
    pub const fn essence(self) -> &'static str {
        match self {
            MediaKind::Pdf => "application/pdf",
            MediaKind::WordProcessing => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Identify the document family from its content. The advisory type supplied by the
/// uploader is only compared against the result and logged when it disagrees.
pub fn sniff(bytes: &[u8], advisory: Option<&str>) -> Result<MediaKind, RecruitmentError> {
    let kind = detect(bytes)?;

    if let Some(advisory) = advisory {
        match advisory.parse::<Mime>() {
            Ok(declared) if declared.essence_str() == kind.essence() => {}
            Ok(declared) => warn!(
                declared = declared.essence_str(),
                detected = kind.essence(),
                "advisory media type contradicts document content"
            ),
            Err(_) => debug!(advisory, "ignoring unparseable advisory media type"),
        }
    }

    debug!(detected = kind.essence(), size = bytes.len(), "document type sniffed");
    Ok(kind)
}

fn detect(bytes: &[u8]) -> Result<MediaKind, RecruitmentError> {
    let head = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    if head.windows(PDF_MAGIC.len()).any(|window| window == PDF_MAGIC) {
        return Ok(MediaKind::Pdf);
    }

    if bytes.starts_with(ZIP_MAGIC) {
        let has_word_part = ZipArchive::new(Cursor::new(bytes))
            .map(|archive| archive.file_names().any(|name| name == WORD_MAIN_PART))
            .unwrap_or(false);
        return if has_word_part {
            Ok(MediaKind::WordProcessing)
        } else {
            Err(unsupported("application/zip"))
        };
    }

    if bytes.starts_with(OLE_MAGIC) {
        return Err(unsupported("application/x-ole-storage"));
    }

    if !bytes.is_empty() && looks_like_text(head) {
        return Err(unsupported("text/plain"));
    }

    Err(unsupported("application/octet-stream"))
}

fn looks_like_text(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(text) => !text.contains('\0'),
        // A multi-byte character cut by the sniff window is still text.
        Err(err) => err.error_len().is_none(),
    }
}

fn unsupported(detected: &str) -> RecruitmentError {
    RecruitmentError::UnsupportedFormat {
        detected: detected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entry: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(entry, zip::write::FileOptions::default())
            .expect("start entry");
        writer.write_all(b"<xml/>").expect("write entry");
        writer.finish().expect("finish zip").into_inner()
    }

    #[test]
    fn detects_pdf_by_magic_not_extension() {
        let kind = sniff(b"%PDF-1.7\n%...", Some("application/msword")).expect("pdf detected");
        assert_eq!(kind, MediaKind::Pdf);
    }

    #[test]
    fn detects_word_container_by_main_part() {
        let bytes = zip_with(WORD_MAIN_PART);
        assert_eq!(sniff(&bytes, None).expect("docx"), MediaKind::WordProcessing);
    }

    #[test]
    fn rejects_other_zip_archives() {
        let bytes = zip_with("xl/workbook.xml");
        match sniff(&bytes, Some(MediaKind::WordProcessing.essence())) {
            Err(RecruitmentError::UnsupportedFormat { detected }) => {
                assert_eq!(detected, "application/zip")
            }
            other => panic!("expected unsupported format, got {other:?}"),
        }
    }

    #[test]
    fn rejects_plain_text_and_empty_payloads() {
        assert!(matches!(
            sniff(b"Jane Doe\nJava developer", None),
            Err(RecruitmentError::UnsupportedFormat { detected }) if detected == "text/plain"
        ));
        assert!(matches!(
            sniff(b"", None),
            Err(RecruitmentError::UnsupportedFormat { detected })
                if detected == "application/octet-stream"
        ));
    }

    #[test]
    fn rejects_legacy_word_binary() {
        let mut bytes = OLE_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            sniff(&bytes, Some("application/msword")),
            Err(RecruitmentError::UnsupportedFormat { .. })
        ));
    }
}
