// Review processing: normalization, text cleaning, and enrichment stages

pub mod aggregate;
pub mod clean;
pub mod enrich;
pub mod keywords;
pub mod normalize;
pub mod sentiment;
pub mod themes;

pub use aggregate::{aggregate_by_rating, bank_overview, BankOverview, SummaryRecord};
pub use clean::TextCleaner;
pub use enrich::{review_fingerprint, EnrichedReview};
pub use keywords::{Keyword, KeywordExtractor};
pub use normalize::{
    DefaultNormalizer, NormalizationOutcome, NormalizationReport, Normalizer, ValidatedReview,
};
pub use sentiment::{Lexicon, SentimentScorer};
pub use themes::{map_keywords, ThemeMap};
