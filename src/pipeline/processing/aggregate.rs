//! Grouped sentiment statistics over one bank's enriched reviews.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};
use crate::pipeline::processing::enrich::EnrichedReview;
use crate::types::SentimentLabel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub bank: String,
    pub rating: u8,
    pub mean_sentiment_score: f64,
}

/// Per-bank sentiment overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankOverview {
    pub bank: String,
    pub review_count: usize,
    pub mean_sentiment_score: f64,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl BankOverview {
    /// Share of reviews with `label`, in [0, 1].
    pub fn share(&self, label: SentimentLabel) -> f64 {
        if self.review_count == 0 {
            return 0.0;
        }
        let count = match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        };
        count as f64 / self.review_count as f64
    }
}

/// Mean sentiment score per rating present, ascending by rating.
pub fn aggregate_by_rating(bank: &str, reviews: &[EnrichedReview]) -> Result<Vec<SummaryRecord>> {
    ensure_non_empty(bank, reviews)?;

    let mut groups: BTreeMap<u8, (f64, usize)> = BTreeMap::new();
    for review in reviews {
        let entry = groups.entry(review.review.rating).or_insert((0.0, 0));
        entry.0 += review.sentiment.score;
        entry.1 += 1;
    }

    Ok(groups
        .into_iter()
        .map(|(rating, (sum, count))| SummaryRecord {
            bank: bank.to_string(),
            rating,
            mean_sentiment_score: sum / count as f64,
        })
        .collect())
}

pub fn bank_overview(bank: &str, reviews: &[EnrichedReview]) -> Result<BankOverview> {
    ensure_non_empty(bank, reviews)?;

    let mut overview = BankOverview {
        bank: bank.to_string(),
        review_count: reviews.len(),
        mean_sentiment_score: 0.0,
        positive: 0,
        neutral: 0,
        negative: 0,
    };
    let mut sum = 0.0;
    for review in reviews {
        sum += review.sentiment.score;
        match review.sentiment.label {
            SentimentLabel::Positive => overview.positive += 1,
            SentimentLabel::Neutral => overview.neutral += 1,
            SentimentLabel::Negative => overview.negative += 1,
        }
    }
    overview.mean_sentiment_score = sum / reviews.len() as f64;
    Ok(overview)
}

fn ensure_non_empty(bank: &str, reviews: &[EnrichedReview]) -> Result<()> {
    if reviews.is_empty() {
        return Err(PipelineError::EmptyBatch {
            bank: bank.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::ValidatedReview;
    use crate::types::SentimentScore;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn enriched(rating: u8, score: f64, label: SentimentLabel) -> EnrichedReview {
        EnrichedReview {
            review_id: format!("{rating}-{score}"),
            review: ValidatedReview {
                text: "text".to_string(),
                rating,
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                bank: "BOA".to_string(),
                source: "Google Play".to_string(),
            },
            cleaned_text: "text".to_string(),
            sentiment: SentimentScore { label, score },
            keywords: vec![],
            themes: BTreeSet::from(["Other".to_string()]),
        }
    }

    #[test]
    fn test_mean_per_rating() {
        let reviews = vec![
            enriched(5, 0.9, SentimentLabel::Positive),
            enriched(1, -0.4, SentimentLabel::Negative),
            enriched(5, 0.3, SentimentLabel::Positive),
            enriched(3, 0.0, SentimentLabel::Neutral),
        ];
        let summary = aggregate_by_rating("BOA", &reviews).unwrap();
        let ratings: Vec<u8> = summary.iter().map(|s| s.rating).collect();
        assert_eq!(ratings, vec![1, 3, 5]);
        assert!((summary[2].mean_sentiment_score - 0.6).abs() < 1e-9);
        assert!((summary[0].mean_sentiment_score + 0.4).abs() < 1e-9);
        assert!(summary.iter().all(|s| s.bank == "BOA"));
    }

    #[test]
    fn test_single_review_group() {
        let reviews = [enriched(2, -0.25, SentimentLabel::Negative)];
        let summary = aggregate_by_rating("BOA", &reviews).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].mean_sentiment_score, -0.25);
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let err = aggregate_by_rating("BOA", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyBatch { bank } if bank == "BOA"));
        assert!(bank_overview("BOA", &[]).is_err());
    }

    #[test]
    fn test_bank_overview() {
        let reviews = vec![
            enriched(5, 0.8, SentimentLabel::Positive),
            enriched(4, 0.0, SentimentLabel::Neutral),
            enriched(1, -0.5, SentimentLabel::Negative),
            enriched(1, -0.3, SentimentLabel::Negative),
        ];
        let overview = bank_overview("BOA", &reviews).unwrap();
        assert_eq!(overview.review_count, 4);
        assert_eq!((overview.positive, overview.neutral, overview.negative), (1, 1, 2));
        assert!(overview.mean_sentiment_score.abs() < 1e-9);
        assert!((overview.share(SentimentLabel::Negative) - 0.5).abs() < 1e-9);
    }
}
