use crate::models::NewsItem;
use crate::vocabulary::Vocabulary;

/// Linear keyword heuristic deciding whether a news item is topic-worthy.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    relevance_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    threshold: f64,
}

impl RelevanceScorer {
    pub fn new(relevance_keywords: Vec<String>, exclude_keywords: Vec<String>, threshold: f64) -> Self {
        Self {
            relevance_keywords: relevance_keywords.iter().map(|k| k.to_lowercase()).collect(),
            exclude_keywords: exclude_keywords.iter().map(|k| k.to_lowercase()).collect(),
            threshold,
        }
    }

    pub fn from_vocabulary(vocabulary: &Vocabulary) -> Self {
        Self::new(
            vocabulary.relevance_keywords.clone(),
            vocabulary.exclude_keywords.clone(),
            vocabulary.min_relevance_score,
        )
    }

    /// +1 per relevance keyword present, −2 per exclude keyword present,
    /// divided by the size of the relevance set. Not clamped.
    pub fn score(&self, item: &NewsItem) -> f64 {
        if self.relevance_keywords.is_empty() {
            return 0.0;
        }
        let haystack = item.haystack();

        let hits = self
            .relevance_keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count() as f64;
        let penalties = self
            .exclude_keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count() as f64;

        (hits - 2.0 * penalties) / self.relevance_keywords.len() as f64
    }

    pub fn is_relevant(&self, item: &NewsItem) -> bool {
        self.score(item) >= self.threshold
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
