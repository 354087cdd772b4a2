use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use docqa_core::loader::{self, Format};
use docqa_core::Error;
use tempfile::TempDir;

fn source_of(path: &Path) -> Option<String> {
    Some(path.to_string_lossy().into_owned())
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Single-page PDF using the built-in Helvetica font, with a valid xref table.
fn write_pdf(path: &Path, text: &str) {
    let stream = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n", objects.len() + 1).as_bytes(),
    );
    fs::write(path, out).unwrap();
}

#[test]
fn format_dispatch_is_case_insensitive() {
    assert_eq!(Format::from_path(Path::new("a.JSON")), Some(Format::Json));
    assert_eq!(Format::from_path(Path::new("dir/b.txt")), Some(Format::Text));
    assert_eq!(Format::from_path(Path::new("c.Docx")), Some(Format::Docx));
    assert_eq!(Format::from_path(Path::new("d.pdf")), Some(Format::Pdf));
    assert_eq!(Format::from_path(Path::new("e.md")), None);
    assert_eq!(Format::from_path(Path::new("noext")), None);
    assert_eq!(Format::Docx.extension(), "docx");
}

#[test]
fn txt_becomes_one_chunk_with_source() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.txt");
    fs::write(&path, "First paragraph.\n\nSecond paragraph.").unwrap();

    let chunks = loader::load(&path);
    assert_eq!(chunks.len(), 1, "whole file is a single chunk");
    assert_eq!(chunks[0].content(), "First paragraph.\n\nSecond paragraph.");
    assert_eq!(chunks[0].source(), source_of(&path));
}

#[test]
fn txt_with_invalid_utf8_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bin.txt");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x9c, b'x']).unwrap();

    assert!(loader::load(&path).is_empty());
    assert!(matches!(loader::try_load(&path), Err(Error::Malformed { .. })));
}

#[test]
fn blank_txt_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.txt");
    fs::write(&path, "  \n\n ").unwrap();
    assert!(loader::load(&path).is_empty());
}

#[test]
fn json_records_are_kept_verbatim() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("chunks.json");
    fs::write(
        &path,
        r#"[
            {"page_content": "alpha", "metadata": {"source": "a.md", "page": 3}},
            {"page_content": "beta"},
            {"page_content": "gamma", "metadata": {"source": "c.md"}}
        ]"#,
    )
    .unwrap();

    let chunks = loader::load(&path);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].content(), "alpha");
    assert_eq!(chunks[0].source().as_deref(), Some("a.md"));
    assert_eq!(chunks[0].metadata().get("page"), Some(&serde_json::json!(3)));
    assert!(chunks[1].metadata().is_empty(), "no source is invented for JSON records");
    assert_eq!(chunks[2].source().as_deref(), Some("c.md"));
}

#[test]
fn json_skips_unusable_records() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mixed.json");
    fs::write(&path, r#"[{"page_content": ""}, 42, {"metadata": {}}, {"page_content": "ok", "metadata": "x"}]"#).unwrap();

    let chunks = loader::load(&path);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content(), "ok");
    assert!(chunks[0].metadata().is_empty());
}

#[test]
fn malformed_json_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    for (name, body) in [
        ("broken.json", "[{\"page_content\": \"unterminated"),
        ("object.json", r#"{"page_content": "not in a list"}"#),
        ("scalar.json", "17"),
        ("empty.json", ""),
    ] {
        let path = tmp.path().join(name);
        fs::write(&path, body).unwrap();
        assert!(loader::load(&path).is_empty(), "{name} should load as empty");
        assert!(matches!(loader::try_load(&path), Err(Error::Malformed { .. })), "{name} should report Malformed");
    }
}

#[test]
fn docx_paragraphs_are_newline_joined() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("report.docx");
    write_docx(&path, &["Quarterly report", "Revenue &amp; costs", "Outlook"]);

    let chunks = loader::load(&path);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content(), "Quarterly report\nRevenue & costs\nOutlook");
    assert_eq!(chunks[0].source(), source_of(&path));
}

#[test]
fn corrupt_docx_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.docx");
    fs::write(&path, "this is not a zip archive").unwrap();
    assert!(loader::load(&path).is_empty());
    assert!(matches!(loader::try_load(&path), Err(Error::Malformed { .. })));
}

#[test]
fn pdf_text_is_extracted_with_source() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("paper.pdf");
    write_pdf(&path, "Hello");

    let chunks = loader::load(&path);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].content().contains("Hello"), "got {:?}", chunks[0].content());
    assert!(chunks[0].content().ends_with('\n'), "every page is newline-terminated");
    assert_eq!(chunks[0].source(), source_of(&path));
}

#[test]
fn corrupt_pdf_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.pdf");
    fs::write(&path, "%PDF-1.4 garbage without structure").unwrap();
    assert!(loader::load(&path).is_empty());
}

#[test]
fn unsupported_extension_is_reported() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("slides.pptx");
    fs::write(&path, "whatever").unwrap();
    assert!(loader::load(&path).is_empty());
    match loader::try_load(&path) {
        Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, ".pptx"),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn missing_file_degrades_to_empty() {
    let path = PathBuf::from("/definitely/not/here.txt");
    assert!(loader::load(&path).is_empty());
    assert!(matches!(loader::try_load(&path), Err(Error::Read { .. })));
}

#[test]
fn directory_batch_continues_past_bad_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::create_dir_all(dir.join(".hidden")).unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("b.json"), "{ not json").unwrap();
    fs::write(dir.join("sub/c.json"), r#"[{"page_content": "charlie"}]"#).unwrap();
    fs::write(dir.join("skip.md"), "markdown is not loaded").unwrap();
    fs::write(dir.join(".hidden/d.txt"), "hidden").unwrap();

    let files = loader::list_supported_files(dir);
    assert_eq!(files, vec![dir.join("a.txt"), dir.join("b.json"), dir.join("sub/c.json")]);

    let contents: Vec<String> = loader::load_path(dir).iter().map(|c| c.content().to_string()).collect();
    assert_eq!(contents, vec!["alpha", "charlie"]);
}
