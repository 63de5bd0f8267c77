//! On-page SEO score of a formatted article.
//!
//! | check                      | points |
//! |----------------------------|--------|
//! | title length               | 20     |
//! | primary keyword in title   | 15     |
//! | meta description length    | 15     |
//! | content length             | 15     |
//! | primary keyword density    | 15     |
//! | section headings           | 15     |
//! | reading time               | 5      |

use serde::Serialize;

use crate::formatting::strip_tags;
use crate::models::Article;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordUsage {
    pub keyword: String,
    pub count: usize,
    /// Percent of words.
    pub density: f64,
    pub in_title: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoReport {
    pub score: u32,
    pub primary: KeywordUsage,
    pub secondary: Vec<KeywordUsage>,
    pub headings: usize,
    pub recommendations: Vec<String>,
}

fn keyword_usage(keyword: &str, text: &str, title: &str, words: usize) -> KeywordUsage {
    let keyword = keyword.trim().to_lowercase();
    let count = if keyword.is_empty() { 0 } else { text.matches(keyword.as_str()).count() };
    let density = if words == 0 { 0.0 } else { count as f64 / words as f64 * 100.0 };
    KeywordUsage {
        in_title: !keyword.is_empty() && title.contains(keyword.as_str()),
        keyword,
        count,
        density,
    }
}

fn heading_count(content: &str) -> usize {
    content.matches("<h2").count() + content.matches("<h3").count()
}

pub fn score_article(article: &Article) -> SeoReport {
    let text = strip_tags(&article.content).to_lowercase();
    let words = text.split_whitespace().count();
    let title = article.title.to_lowercase();

    let primary = keyword_usage(&article.primary_keyword, &text, &title, words);
    let secondary = article
        .secondary_keywords
        .iter()
        .map(|k| keyword_usage(k, &text, &title, words))
        .collect();
    let headings = heading_count(&article.content);

    let mut score = 0;
    let mut recommendations = Vec::new();

    score += match article.title.chars().count() {
        50..=60 => 20,
        40..=70 => 15,
        _ => 5,
    };

    if primary.in_title {
        score += 15;
    } else if !primary.keyword.is_empty() {
        recommendations.push(format!("Voeg '{}' toe aan de titel", primary.keyword));
    }

    score += match article.meta_description.chars().count() {
        150..=160 => 15,
        120..=170 => 10,
        _ => 5,
    };

    score += match words {
        1000..=2000 => 15,
        800..=2500 => 10,
        _ => 5,
    };

    let density = primary.density;
    score += if (1.0..=2.0).contains(&density) {
        15
    } else if (0.5..=3.0).contains(&density) {
        10
    } else {
        5
    };
    if !primary.keyword.is_empty() {
        if density < 1.0 {
            recommendations.push(format!(
                "Verhoog dichtheid van '{}' (nu {:.1}%, doel: 1-2%)",
                primary.keyword, density
            ));
        } else if density > 3.0 {
            recommendations.push(format!(
                "Verlaag dichtheid van '{}' (nu {:.1}%, doel: 1-2%)",
                primary.keyword, density
            ));
        }
    }

    score += match headings {
        3..=8 => 15,
        0 => {
            recommendations.push("Voeg tussenkoppen toe".to_string());
            0
        }
        _ => 8,
    };

    if (3..=10).contains(&article.reading_time_minutes) {
        score += 5;
    }

    SeoReport {
        score: score.min(100),
        primary,
        secondary,
        headings,
        recommendations,
    }
}
