//! Overlap-based correlation proxy between two markets.

use std::collections::HashSet;
use std::hash::Hash;

use super::types::Market;

const TAG_WEIGHT: f64 = 0.3;
const TITLE_WEIGHT: f64 = 0.4;
const CATEGORY_WEIGHT: f64 = 0.2;
const SERIES_WEIGHT: f64 = 0.1;

/// `|a ∩ b| / |a ∪ b|`, or 0 when both sets are empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn title_words(title: &str) -> HashSet<String> {
    title.to_lowercase().split_whitespace().map(String::from).collect()
}

/// Weighted tag, title-word, category and series overlap, capped at 1.
pub fn correlation_score(a: &Market, b: &Market) -> f64 {
    let tags_a: HashSet<&str> = a.tags.iter().map(String::as_str).collect();
    let tags_b: HashSet<&str> = b.tags.iter().map(String::as_str).collect();

    let mut score = TAG_WEIGHT * jaccard(&tags_a, &tags_b)
        + TITLE_WEIGHT * jaccard(&title_words(&a.title), &title_words(&b.title));
    if a.category == b.category {
        score += CATEGORY_WEIGHT;
    }
    if a.series() == b.series() {
        score += SERIES_WEIGHT;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(ticker: &str, title: &str, category: &str, tags: &[&str]) -> Market {
        Market {
            ticker: ticker.into(),
            title: title.into(),
            category: category.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<_> = [1, 2, 3].into();
        let b: HashSet<_> = [2, 3, 4].into();
        assert_eq!(jaccard(&a, &b), 0.5);
        assert_eq!(jaccard::<i32>(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_identical_markets_score_one() {
        let a = market("PRES-1", "Who wins", "Politics", &["election"]);
        assert!((correlation_score(&a, &a.clone()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_overlap() {
        let a = market("PRES-DEM", "Democrat wins presidency", "Politics", &["election", "dem"]);
        let b = market("PRES-REP", "Republican wins presidency", "Politics", &["election", "rep"]);
        // tags 1/3, title words 2/4, same category, same series
        let expected = 0.3 / 3.0 + 0.4 * 0.5 + 0.2 + 0.1;
        assert!((correlation_score(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let a = market("A", "Rate CUT", "Econ", &[]);
        let b = market("B", "rate cut", "Fed", &[]);
        assert!((correlation_score(&a, &b) - 0.4).abs() < 1e-12);
    }
}
