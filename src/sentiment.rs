use vader_sentiment::SentimentIntensityAnalyzer;

/// Scores text polarity in `[-1, 1]`; negative means negative sentiment.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// VADER compound score of the post text with handles and links removed.
#[derive(Debug, Clone, Default)]
pub struct VaderScorer;

impl VaderScorer {
    pub fn new() -> Self {
        Self
    }

    /// Handles and links carry no sentiment
    fn strip_noise(text: &str) -> String {
        text.split_whitespace()
            .filter(|raw| !raw.starts_with('@') && !raw.starts_with("http"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> f64 {
        let cleaned = Self::strip_noise(text);
        if cleaned.is_empty() {
            return 0.0;
        }
        let analyzer = SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(&cleaned);
        scores
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}
