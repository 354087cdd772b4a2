use docqa_core::config::EmbeddingSettings;
use docqa_embed::embedder_from_settings;

// Slow and needs weights on disk:
//   APP_MODEL_DIR=/path/to/models cargo test -p docqa-embed --test real_model_tests -- --ignored
// where /path/to/models/all-MiniLM-L6-v2 holds tokenizer.json, config.json, model.safetensors.
#[test]
#[ignore]
fn minilm_produces_normalized_384d_vectors() {
    let embedder = embedder_from_settings(&EmbeddingSettings::default()).expect("load model");
    assert_eq!(embedder.model_id(), "all-MiniLM-L6-v2");
    assert_eq!(embedder.dim(), 384);

    let texts: Vec<String> = ["apple", "banana", "a very different sentence about cars"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let batch = embedder.embed_batch(&texts).expect("embed");
    assert_eq!(batch.len(), 3);
    for v in &batch {
        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3, "norm={norm}");
    }

    // padding in a batch must not change a row's embedding
    let single = embedder.embed("apple").expect("embed single");
    for (a, b) in single.iter().zip(&batch[0]) {
        assert!((a - b).abs() < 1e-4);
    }
}
