//! Quality gate every generated article must pass before publication.

use std::collections::HashSet;
use std::fmt;

use crate::config::QaSettings;
use crate::formatting::{paragraph_count, strip_tags};

#[derive(Debug, Clone, PartialEq)]
pub enum QaFailure {
    TooShort { words: usize, min: usize },
    TooLong { words: usize, max: usize },
    TooFewParagraphs { found: usize, min: usize },
    KeywordDensity { keyword: String, density: f64, min: f64, max: f64 },
    WrongLanguage { presence: f64, disallowed_ratio: f64 },
}

impl fmt::Display for QaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QaFailure::TooShort { words, min } => write!(f, "too short: {} words (min {})", words, min),
            QaFailure::TooLong { words, max } => write!(f, "too long: {} words (max {})", words, max),
            QaFailure::TooFewParagraphs { found, min } => {
                write!(f, "only {} paragraphs (min {})", found, min)
            }
            QaFailure::KeywordDensity { keyword, density, min, max } => write!(
                f,
                "keyword '{}' density {:.2}% outside {:.1}%-{:.1}%",
                keyword,
                density * 100.0,
                min * 100.0,
                max * 100.0
            ),
            QaFailure::WrongLanguage { presence, disallowed_ratio } => write!(
                f,
                "language check failed: target presence {:.2}, disallowed ratio {:.2}",
                presence, disallowed_ratio
            ),
        }
    }
}

/// Measurements taken by [`QaGate::validate`] and the gates they failed.
#[derive(Debug, Clone, PartialEq)]
pub struct QaReport {
    pub word_count: usize,
    pub paragraph_count: usize,
    pub keyword_density: f64,
    pub target_presence: f64,
    pub disallowed_ratio: f64,
    pub failures: Vec<QaFailure>,
}

impl QaReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub struct QaGate {
    settings: QaSettings,
}

impl QaGate {
    pub fn new(settings: QaSettings) -> Self {
        Self { settings }
    }

    pub fn validate(&self, content: &str, primary_keyword: &str) -> QaReport {
        let s = &self.settings;
        let text = strip_tags(content);
        let lower = text.to_lowercase();
        let word_count = text.split_whitespace().count();
        let paragraphs = paragraph_count(content);

        let mut failures = Vec::new();

        if word_count < s.min_words {
            failures.push(QaFailure::TooShort { words: word_count, min: s.min_words });
        }
        if word_count > s.max_words {
            failures.push(QaFailure::TooLong { words: word_count, max: s.max_words });
        }
        if paragraphs < s.min_paragraphs {
            failures.push(QaFailure::TooFewParagraphs { found: paragraphs, min: s.min_paragraphs });
        }

        let keyword = primary_keyword.trim().to_lowercase();
        let density = if keyword.is_empty() || word_count == 0 {
            0.0
        } else {
            lower.matches(keyword.as_str()).count() as f64 / word_count as f64
        };
        if !keyword.is_empty() && (density < s.keyword_density_min || density > s.keyword_density_max) {
            failures.push(QaFailure::KeywordDensity {
                keyword,
                density,
                min: s.keyword_density_min,
                max: s.keyword_density_max,
            });
        }

        let (presence, disallowed_ratio) = self.language_signal(&lower);
        let language_ok = s.target_language_words.is_empty()
            || (presence >= s.min_target_presence && disallowed_ratio <= s.max_disallowed_ratio);
        if !language_ok {
            failures.push(QaFailure::WrongLanguage { presence, disallowed_ratio });
        }

        QaReport {
            word_count,
            paragraph_count: paragraphs,
            keyword_density: density,
            target_presence: presence,
            disallowed_ratio,
            failures,
        }
    }

    /// Share of target function words present, and disallowed-word tokens
    /// per target-word token.
    fn language_signal(&self, lower: &str) -> (f64, f64) {
        let targets: HashSet<&str> = self.settings.target_language_words.iter().map(String::as_str).collect();
        let disallowed: HashSet<&str> =
            self.settings.disallowed_language_words.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let mut target_tokens = 0usize;
        let mut disallowed_tokens = 0usize;

        for token in lower.split(|c: char| !c.is_alphabetic()).filter(|t| !t.is_empty()) {
            if targets.contains(token) {
                target_tokens += 1;
                seen.insert(token);
            } else if disallowed.contains(token) {
                disallowed_tokens += 1;
            }
        }

        let presence = if targets.is_empty() {
            1.0
        } else {
            seen.len() as f64 / targets.len() as f64
        };
        let ratio = match (target_tokens, disallowed_tokens) {
            (_, 0) => 0.0,
            (0, _) => f64::INFINITY,
            (t, d) => d as f64 / t as f64,
        };
        (presence, ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUTCH: [&str; 14] = [
        "de", "jager", "ziet", "het", "wild", "in", "een", "veld", "met", "veel", "dekking", "voor",
        "zijn", "hond",
    ];

    const ENGLISH: [&str; 12] = [
        "the", "hunter", "sees", "the", "game", "and", "waits", "for", "a", "shot", "with", "care",
    ];

    /// `words` tokens drawn from `filler`, `keyword` spread evenly
    /// `keyword_count` times, split into `paragraphs` blank-line blocks.
    fn article(filler: &[&str], words: usize, keyword: &str, keyword_count: usize, paragraphs: usize) -> String {
        let step = words / keyword_count.max(1);
        let tokens: Vec<&str> = (0..words)
            .map(|i| {
                if keyword_count > 0 && i % step == 0 && i / step < keyword_count {
                    keyword
                } else {
                    filler[i % filler.len()]
                }
            })
            .collect();

        tokens
            .chunks(words.div_ceil(paragraphs))
            .map(|chunk| chunk.join(" "))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn gate() -> QaGate {
        QaGate::new(QaSettings::default())
    }

    #[test]
    fn short_article_fails() {
        let text = article(&DUTCH, 200, "reewild", 2, 4);
        let report = gate().validate(&text, "reewild");
        assert!(!report.passed());
        assert!(report
            .failures
            .iter()
            .any(|f| matches!(f, QaFailure::TooShort { words: 200, min: 500 })));
    }

    #[test]
    fn well_formed_dutch_article_passes() {
        let text = article(&DUTCH, 1500, "reewild", 15, 4);
        let report = gate().validate(&text, "reewild");

        assert_eq!(report.word_count, 1500);
        assert_eq!(report.paragraph_count, 4);
        assert!((report.keyword_density - 0.01).abs() < 1e-9);
        assert!(report.passed(), "{}", report.summary());
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let text = article(&DUTCH, 1000, "Reewild", 10, 4);
        let report = gate().validate(&text, "reewild");
        assert!(report.passed(), "{}", report.summary());
    }

    #[test]
    fn too_few_paragraphs_fails() {
        let text = article(&DUTCH, 1500, "reewild", 15, 3);
        let report = gate().validate(&text, "reewild");
        assert_eq!(
            report.failures,
            vec![QaFailure::TooFewParagraphs { found: 3, min: 4 }]
        );
    }

    #[test]
    fn keyword_stuffing_fails() {
        let text = article(&DUTCH, 1000, "reewild", 50, 4);
        let report = gate().validate(&text, "reewild");
        assert!(matches!(report.failures.as_slice(), [QaFailure::KeywordDensity { .. }]));
    }

    #[test]
    fn missing_keyword_fails() {
        let text = article(&DUTCH, 1000, "reewild", 0, 4);
        let report = gate().validate(&text, "damhert");
        assert_eq!(report.keyword_density, 0.0);
        assert!(!report.passed());
    }

    #[test]
    fn english_article_fails_language_check() {
        let text = article(&ENGLISH, 1500, "deer", 15, 4);
        let report = gate().validate(&text, "deer");
        assert!(matches!(report.failures.as_slice(), [QaFailure::WrongLanguage { .. }]));
    }

    #[test]
    fn markup_is_ignored_when_counting() {
        let body = article(&DUTCH, 1500, "reewild", 15, 4)
            .split("\n\n")
            .map(|p| format!("<p>{}</p>", p))
            .collect::<Vec<_>>()
            .join("\n");
        let report = gate().validate(&body, "reewild");
        assert_eq!(report.word_count, 1500);
        assert_eq!(report.paragraph_count, 4);
        assert!(report.passed(), "{}", report.summary());
    }
}
