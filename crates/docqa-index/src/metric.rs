use docqa_core::Metric;

/// Raw distance between two equal-length vectors; lower is closer.
pub fn distance(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Euclidean => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        Metric::Cosine => {
            let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
            for (x, y) in a.iter().zip(b) {
                dot += x * y;
                na += x * x;
                nb += y * y;
            }
            if na == 0.0 || nb == 0.0 {
                return 1.0;
            }
            1.0 - dot / (na.sqrt() * nb.sqrt())
        }
    }
}

/// Maps a distance to a higher-is-better score.
pub fn score(metric: Metric, distance: f32) -> f32 {
    match metric {
        Metric::Euclidean => 1.0 / (1.0 + distance),
        Metric::Cosine => 1.0 - distance,
    }
}
