use tracing::{debug, info};

use super::correlation::correlation_score;
use super::types::{Market, Opportunity, RiskLevel};

/// Two markets whose last prices sum below this leave room for profit.
pub const PRICE_SUM_CEILING: f64 = 0.95;
const MAX_CONFIDENCE: f64 = 0.9;

pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_OPPORTUNITIES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedPair<'a> {
    pub first: &'a Market,
    pub second: &'a Market,
    pub correlation: f64,
}

/// Markets mentioning any of `tags` (case-insensitive) in their tags,
/// title or category. An empty tag list keeps everything.
pub fn filter_by_tags(markets: &[Market], tags: &[String]) -> Vec<Market> {
    if tags.is_empty() {
        return markets.to_vec();
    }
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    markets
        .iter()
        .filter(|m| {
            let mut haystack = m.tags.clone();
            haystack.push(m.title.clone());
            haystack.push(m.category.clone());
            let haystack = haystack.join(" ").to_lowercase();
            tags.iter().any(|t| haystack.contains(t.as_str()))
        })
        .cloned()
        .collect()
}

/// Groups markets by [`Market::series`], in first-seen order.
pub fn group_by_series(markets: &[Market]) -> Vec<Vec<&Market>> {
    let mut groups: Vec<(&str, Vec<&Market>)> = Vec::new();
    for market in markets {
        let series = market.series();
        match groups.iter_mut().find(|(s, _)| *s == series) {
            Some((_, members)) => members.push(market),
            None => groups.push((series, vec![market])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Every within-series pair scoring at least `threshold`.
pub fn find_correlated_pairs(markets: &[Market], threshold: f64) -> Vec<CorrelatedPair<'_>> {
    let mut pairs = Vec::new();
    for group in group_by_series(markets) {
        for (i, &first) in group.iter().enumerate() {
            for &second in &group[i + 1..] {
                let correlation = correlation_score(first, second);
                if correlation >= threshold {
                    pairs.push(CorrelatedPair {
                        first,
                        second,
                        correlation,
                    });
                }
            }
        }
    }
    debug!(pairs = pairs.len(), threshold, "Correlated pairs found");
    pairs
}

/// Pairs whose last prices sum below [`PRICE_SUM_CEILING`], most
/// profitable first.
pub fn detect_opportunities(pairs: &[CorrelatedPair<'_>]) -> Vec<Opportunity> {
    let mut opportunities: Vec<Opportunity> = pairs
        .iter()
        .filter_map(|pair| {
            let (a, b) = (pair.first, pair.second);
            let price_sum = a.last_price + b.last_price;
            if price_sum >= PRICE_SUM_CEILING {
                return None;
            }
            let avg_volume = (a.volume_24h as f64 + b.volume_24h as f64) / 2.0;
            Some(Opportunity {
                description: format!("Arbitrage between '{}' and '{}'", a.title, b.title),
                markets: vec![a.clone(), b.clone()],
                potential_profit: (1.0 - price_sum) * 100.0,
                risk_level: RiskLevel::from_volume(avg_volume),
                confidence: pair.correlation.min(MAX_CONFIDENCE),
            })
        })
        .collect();

    opportunities.sort_by(|a, b| b.potential_profit.total_cmp(&a.potential_profit));
    opportunities
}

/// Tag filter, pairing and opportunity ranking in one pass.
#[derive(Debug, Clone)]
pub struct ArbitrageDetector {
    pub threshold: f64,
    pub max_opportunities: usize,
}

impl Default for ArbitrageDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_opportunities: DEFAULT_MAX_OPPORTUNITIES,
        }
    }
}

impl ArbitrageDetector {
    #[tracing::instrument(skip_all, fields(markets = markets.len(), tags = tags.len(), threshold = self.threshold))]
    pub fn detect(&self, markets: &[Market], tags: &[String]) -> Vec<Opportunity> {
        let candidates = filter_by_tags(markets, tags);
        let pairs = find_correlated_pairs(&candidates, self.threshold);
        let mut opportunities = detect_opportunities(&pairs);
        opportunities.truncate(self.max_opportunities);

        info!(
            candidates = candidates.len(),
            pairs = pairs.len(),
            opportunities = opportunities.len(),
            "Arbitrage scan complete"
        );
        opportunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(ticker: &str, title: &str, price: f64, volume_24h: u64) -> Market {
        Market {
            ticker: ticker.into(),
            title: title.into(),
            category: "Politics".into(),
            tags: vec!["election".into()],
            last_price: price,
            volume_24h,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_opportunity_from_correlated_pair() {
        let a = market("PRES-A", "x", 0.40, 500);
        let b = market("PRES-B", "y", 0.45, 700);
        let pair = CorrelatedPair {
            first: &a,
            second: &b,
            correlation: 0.7,
        };
        let opps = detect_opportunities(&[pair]);
        assert_eq!(opps.len(), 1);
        assert!((opps[0].potential_profit - 15.0).abs() < 1e-9);
        assert_eq!(opps[0].confidence, 0.7);
        assert_eq!(opps[0].risk_level, RiskLevel::High);
        assert_eq!(opps[0].description, "Arbitrage between 'x' and 'y'");
    }

    #[test]
    fn test_confidence_is_capped() {
        let a = market("PRES-A", "x", 0.1, 20_000);
        let b = market("PRES-B", "y", 0.1, 20_000);
        let pair = CorrelatedPair {
            first: &a,
            second: &b,
            correlation: 1.0,
        };
        let opps = detect_opportunities(&[pair]);
        assert_eq!(opps[0].confidence, 0.9);
        assert_eq!(opps[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_no_opportunity_at_price_ceiling() {
        let a = market("PRES-A", "x", 0.50, 0);
        let b = market("PRES-B", "y", 0.45, 0);
        let pair = CorrelatedPair {
            first: &a,
            second: &b,
            correlation: 0.9,
        };
        assert!(detect_opportunities(&[pair]).is_empty());
    }

    #[test]
    fn test_pairs_only_within_series() {
        let markets = vec![
            market("PRES-A", "who wins the race", 0.3, 0),
            market("SEN-A", "who wins the race", 0.3, 0),
            market("PRES-B", "who wins the race", 0.3, 0),
        ];
        let pairs = find_correlated_pairs(&markets, 0.6);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.ticker, "PRES-A");
        assert_eq!(pairs[0].second.ticker, "PRES-B");
        assert!((pairs[0].correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_group_by_series_keeps_first_seen_order() {
        let markets = vec![
            market("B-1", "", 0.0, 0),
            market("A-1", "", 0.0, 0),
            market("B-2", "", 0.0, 0),
        ];
        let groups = group_by_series(&markets);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].ticker, "A-1");
    }

    #[test]
    fn test_filter_by_tags_searches_title_and_category() {
        let mut other = market("FED-1", "Rate cut in June", 0.3, 0);
        other.category = "Economics".into();
        other.tags.clear();
        let markets = vec![market("PRES-A", "Who wins", 0.3, 0), other];

        assert_eq!(filter_by_tags(&markets, &["RATE".into()]).len(), 1);
        assert_eq!(filter_by_tags(&markets, &["economics".into(), "election".into()]).len(), 2);
        assert_eq!(filter_by_tags(&markets, &[]).len(), 2);
        assert!(filter_by_tags(&markets, &["crypto".into()]).is_empty());
    }

    #[test]
    fn test_detector_sorts_and_truncates() {
        let markets = vec![
            market("PRES-A", "who wins", 0.40, 0),
            market("PRES-B", "who wins", 0.45, 0),
            market("PRES-C", "who wins", 0.10, 0),
        ];
        let detector = ArbitrageDetector {
            threshold: 0.6,
            max_opportunities: 2,
        };
        let opps = detector.detect(&markets, &["election".into()]);
        assert_eq!(opps.len(), 2);
        assert!(opps[0].potential_profit >= opps[1].potential_profit);
        // A+C (0.50) then B+C (0.55)
        assert_eq!(opps[0].markets[0].ticker, "PRES-A");
        assert_eq!(opps[0].markets[1].ticker, "PRES-C");
    }
}
