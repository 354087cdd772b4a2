use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// Implementations must be deterministic for a given model and input, and
/// `embed_batch` must return exactly one vector per input, in input order.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model, recorded in every index
    /// built with this embedder.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| crate::Error::Encoding("embedder returned no vector".into()))
    }
}

/// Produces a natural-language answer from a question and retrieved context.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, query: &str, context: &str) -> Result<String>;
}
