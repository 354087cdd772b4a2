//! Answer generators that turn retrieved context into a reply.

mod ollama;

use docqa_core::config::{GeneratorKind, GeneratorSettings};
use docqa_core::{Generator, Result};
use tracing::info;

pub use ollama::OllamaGenerator;

pub const PLACEHOLDER_ANSWER: &str = "(Answer generation requires an LLM integration)";

/// Stands in for a real model: always returns [`PLACEHOLDER_ANSWER`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderGenerator;

impl Generator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn generate(&self, _query: &str, _context: &str) -> Result<String> {
        Ok(PLACEHOLDER_ANSWER.to_string())
    }
}

/// Prompt asking the model to answer only from `context`.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "Context information:\n{context}\n\nQuestion: {query}\n\n\
         Please provide a comprehensive answer to the question based only on the provided context \
         information. If the context doesn't contain relevant information, state that you cannot \
         answer the question based on the available information.\n\nAnswer:\n"
    )
}

/// The configured generator, or `None` when generation is disabled.
pub fn generator_from_settings(settings: &GeneratorSettings) -> Result<Option<Box<dyn Generator>>> {
    let generator: Box<dyn Generator> = match settings.kind {
        GeneratorKind::Disabled => return Ok(None),
        GeneratorKind::Placeholder => Box::new(PlaceholderGenerator),
        GeneratorKind::Ollama => Box::new(OllamaGenerator::new(settings)?),
    };
    info!(generator = generator.name(), "answer generation enabled");
    Ok(Some(generator))
}
