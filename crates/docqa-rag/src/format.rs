use docqa_core::Chunk;

pub const NO_RESULTS: &str = "No relevant information found.";

/// Renders chunks as numbered blocks:
/// `Document <n> [Source: <source>]:\n<content>\n`, joined by a newline.
/// The source annotation is omitted for chunks without one.
pub fn format_results(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return NO_RESULTS.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let meta = chunk.source().map(|s| format!(" [Source: {s}]")).unwrap_or_default();
            format!("Document {}{meta}:\n{}\n", i + 1, chunk.content())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Chunk contents separated by blank lines, as handed to a generator.
pub fn context_text(chunks: &[Chunk]) -> String {
    chunks.iter().map(Chunk::content).collect::<Vec<_>>().join("\n\n")
}
