use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Chunk;

const DOCUMENT_PART: &str = "word/document.xml";

/// Joins the document's paragraphs with `\n` into one chunk.
pub(super) fn load(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = super::read_bytes(path)?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::malformed(path, e))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| Error::malformed(path, format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::malformed(path, format!("{DOCUMENT_PART}: {e}")))?;

    let text = paragraphs_from_document_xml(&xml).join("\n");
    Ok(super::single_chunk(path, text))
}

/// Extracts paragraph texts from a WordprocessingML `document.xml` body.
///
/// Text runs (`w:t`) are concatenated per paragraph (`w:p`); `w:tab` becomes a
/// tab and `w:br`/`w:cr` a newline. Everything else is markup and dropped.
/// Paragraphs can nest (text boxes inside a body paragraph); an inner
/// paragraph is emitted when it closes and the outer one keeps collecting.
pub fn paragraphs_from_document_xml(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut rest = xml;

    while let Some(lt) = rest.find('<') {
        if in_text {
            if let Some(p) = open.last_mut() {
                p.push_str(&decode_entities(&rest[..lt]));
            }
        }
        let Some(gt) = rest[lt..].find('>') else { break };
        let tag = &rest[lt + 1..lt + gt];
        rest = &rest[lt + gt + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");

        match (name, closing) {
            ("w:p", false) if self_closing => paragraphs.push(String::new()),
            ("w:p", false) => open.push(String::new()),
            ("w:p", true) => {
                if let Some(p) = open.pop() {
                    paragraphs.push(p);
                }
                in_text = false;
            }
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:tab", false) => {
                if let Some(p) = open.last_mut() {
                    p.push('\t');
                }
            }
            ("w:br" | "w:cr", false) => {
                if let Some(p) = open.last_mut() {
                    p.push('\n');
                }
            }
            _ => {}
        }
    }
    // truncated document: keep what the unclosed paragraphs collected
    paragraphs.extend(open.into_iter().rev());
    paragraphs
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else { break };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
