use std::io::{Cursor, Read};
use std::panic::{self, UnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};
use zip::ZipArchive;

use super::detect::{sniff, MediaKind};
use super::CandidateDocument;
use crate::config::PipelineConfig;
use crate::workflows::recruitment::RecruitmentError;

const WORD_MAIN_PART: &str = "word/document.xml";

/// Plain text recovered from a candidate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub kind: MediaKind,
    pub text: String,
}

/// Converts PDF and Word documents to plain text. Image-only documents yield empty text;
/// there is no OCR.
#[derive(Debug, Clone)]
pub struct DocumentTextExtractor {
    max_bytes: usize,
    timeout: Duration,
}

impl DocumentTextExtractor {
    pub fn new(max_bytes: usize, timeout: Duration) -> Self {
        Self { max_bytes, timeout }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_document_bytes, config.extraction_timeout)
    }

    pub fn extract(&self, document: &CandidateDocument) -> Result<ExtractedDocument, RecruitmentError> {
        if document.bytes.len() > self.max_bytes {
            return Err(RecruitmentError::Validation(format!(
                "document '{}' is {} bytes, the limit is {}",
                document.file_name,
                document.bytes.len(),
                self.max_bytes
            )));
        }

        let kind = sniff(&document.bytes, document.advisory_media_type.as_deref())?;
        let bytes = document.bytes.clone();
        let text = run_bounded(self.timeout, move || decode(kind, &bytes))?;

        info!(
            file = %document.file_name,
            kind = kind.essence(),
            chars = text.chars().count(),
            "document text extracted"
        );
        Ok(ExtractedDocument { kind, text })
    }
}

impl Default for DocumentTextExtractor {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn decode(kind: MediaKind, bytes: &[u8]) -> Result<String, RecruitmentError> {
    match kind {
        MediaKind::Pdf => pdf_text(bytes),
        MediaKind::WordProcessing => word_text(bytes),
    }
}

fn pdf_text(bytes: &[u8]) -> Result<String, RecruitmentError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| RecruitmentError::Extraction(format!("unreadable PDF: {err:?}")))?;
    let text = without_leading_blank_lines(&raw);
    debug!(raw_chars = raw.len(), text_chars = text.len(), "pdf text decoded");
    Ok(text.to_string())
}

/// The PDF decoder opens pages with empty lines; the first line must be the first glyphs.
fn without_leading_blank_lines(text: &str) -> &str {
    match text.find(|c: char| !c.is_whitespace()) {
        Some(first) => {
            let line_start = text[..first].rfind('\n').map_or(0, |newline| newline + 1);
            &text[line_start..]
        }
        None => "",
    }
}

/// Run a decoder on its own thread so a pathological document can neither hang nor crash
/// the caller. On timeout the worker is abandoned, not killed.
fn run_bounded<F>(timeout: Duration, job: F) -> Result<String, RecruitmentError>
where
    F: FnOnce() -> Result<String, RecruitmentError> + Send + UnwindSafe + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("document-extract".to_string())
        .spawn(move || {
            let _ = sender.send(panic::catch_unwind(job));
        })
        .map_err(|err| RecruitmentError::Extraction(format!("cannot start extractor: {err}")))?;

    match receiver.recv_timeout(timeout) {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder panicked".to_string());
            Err(RecruitmentError::Extraction(reason))
        }
        Err(RecvTimeoutError::Timeout) => Err(RecruitmentError::ExtractionTimeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(RecruitmentError::Extraction(
            "extractor exited without a result".to_string(),
        )),
    }
}

fn word_text(bytes: &[u8]) -> Result<String, RecruitmentError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| RecruitmentError::Extraction(format!("unreadable Word container: {err}")))?;
    let mut xml = String::new();
    archive
        .by_name(WORD_MAIN_PART)
        .map_err(|err| RecruitmentError::Extraction(format!("missing {WORD_MAIN_PART}: {err}")))?
        .read_to_string(&mut xml)
        .map_err(|err| RecruitmentError::Extraction(format!("unreadable {WORD_MAIN_PART}: {err}")))?;

    let text = paragraphs(&xml)?;
    debug!(xml_bytes = xml.len(), text_chars = text.len(), "word document flattened");
    Ok(text)
}

/// Flatten WordprocessingML body text: one line per paragraph, tabs and breaks kept.
fn paragraphs(xml: &str) -> Result<String, RecruitmentError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;
    let mut in_paragraph_properties = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| RecruitmentError::Extraction(format!("malformed document XML: {err}")))?;
        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"t" => in_run_text = true,
                b"pPr" => in_paragraph_properties = true,
                _ => {}
            },
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"pPr" => in_paragraph_properties = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(element) if !in_paragraph_properties => {
                match element.local_name().as_ref() {
                    b"tab" => text.push('\t'),
                    b"br" | b"cr" | b"p" => text.push('\n'),
                    _ => {}
                }
            }
            Event::Text(content) if in_run_text => {
                let content = content.unescape().map_err(|err| {
                    RecruitmentError::Extraction(format!("malformed document text: {err}"))
                })?;
                text.push_str(&content);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
