//! Static keyword vocabularies for relevance scoring, topic synthesis and
//! category rotation. Treated as read-only input by every component.

use serde::Deserialize;

/// Maps a generated blog title to the words that must appear in a news item.
///
/// A rule matches when every `all_of` word is present and, if `any_of` is
/// non-empty, at least one `any_of` word is present as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TitleRule {
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
    pub title: String,
}

impl TitleRule {
    fn new(all_of: &[&str], any_of: &[&str], title: &str) -> Self {
        Self {
            all_of: all_of.iter().map(|s| s.to_string()).collect(),
            any_of: any_of.iter().map(|s| s.to_string()).collect(),
            title: title.to_string(),
        }
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.all_of.iter().all(|w| haystack.contains(w.as_str()))
            && (self.any_of.is_empty() || self.any_of.iter().any(|w| haystack.contains(w.as_str())))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryKeywords {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Rotation order for `next_category`; ties resolve to the earlier entry.
    pub categories: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub min_relevance_score: f64,
    /// `{current_year}` is replaced with the year at discovery time.
    pub search_queries: Vec<String>,
    pub results_per_query: usize,
    pub title_rules: Vec<TitleRule>,
    pub fallback_title_keywords: Vec<String>,
    /// `{year}` is replaced with the year at discovery time.
    pub fallback_title: String,
    pub topic_keywords: Vec<String>,
    pub max_topic_keywords: usize,
    /// Checked in order; the first intersecting entry wins.
    pub category_keywords: Vec<CategoryKeywords>,
    pub default_category: String,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            categories: words(&[
                "wild",
                "regelgeving",
                "veiligheid",
                "seizoenen",
                "examenvoorbereiding",
                "planten",
                "algemeen",
            ]),
            relevance_keywords: words(&[
                "jacht",
                "wild",
                "natuur",
                "beheer",
                "seizoen",
                "wetgeving",
                "vergunning",
                "examen",
            ]),
            exclude_keywords: words(&["ongeval", "protest", "verbod", "kritiek"]),
            min_relevance_score: 0.7,
            search_queries: words(&[
                "jacht nederland nieuws",
                "wildbeheer actueel",
                "jachtseizoen {current_year}",
                "natuurbeheer nederland",
                "faunabeheer nieuws",
            ]),
            results_per_query: 5,
            title_rules: vec![
                TitleRule::new(
                    &["wild", "beheer"],
                    &[],
                    "Wildbeheer Nederland: Nieuwe Ontwikkelingen voor Jagers",
                ),
                TitleRule::new(
                    &["jacht", "seizoen"],
                    &[],
                    "Jachtseizoen Update: Wat Jagers Moeten Weten",
                ),
                TitleRule::new(
                    &["natuurbeheer"],
                    &[],
                    "Natuurbeheer en Jacht: Actuele Ontwikkelingen",
                ),
                TitleRule::new(
                    &[],
                    &["wetgeving", "wet"],
                    "Jachtwetgeving Update: Nieuwe Regels en Richtlijnen",
                ),
            ],
            fallback_title_keywords: words(&["jacht", "wild", "natuur"]),
            fallback_title: "Jachtexamen Update: Actuele Ontwikkelingen {year}".to_string(),
            topic_keywords: words(&[
                "jacht",
                "wild",
                "beheer",
                "seizoen",
                "wetgeving",
                "examen",
                "natuur",
                "veiligheid",
                "regelgeving",
                "ree",
                "zwijn",
                "hert",
                "fazant",
                "patrijs",
                "eend",
                "haas",
                "konijn",
                "vos",
            ]),
            max_topic_keywords: 5,
            category_keywords: vec![
                CategoryKeywords {
                    category: "wild".to_string(),
                    keywords: words(&[
                        "wild", "dier", "ree", "zwijn", "hert", "fazant", "eend", "haas", "vos",
                    ]),
                },
                CategoryKeywords {
                    category: "regelgeving".to_string(),
                    keywords: words(&["wet", "regel", "verbod", "toestemming", "vergunning"]),
                },
                CategoryKeywords {
                    category: "veiligheid".to_string(),
                    keywords: words(&["veilig", "ongeval", "letsel", "bescherming"]),
                },
                CategoryKeywords {
                    category: "seizoenen".to_string(),
                    keywords: words(&["seizoen", "periode", "tijd", "maand"]),
                },
                CategoryKeywords {
                    category: "examenvoorbereiding".to_string(),
                    keywords: words(&["examen", "test", "opleiding", "cursus"]),
                },
            ],
            default_category: "algemeen".to_string(),
        }
    }
}
