//! Corpus-relative TF-IDF keyword extraction.
//!
//! Weights depend on document frequencies across the whole batch, so the extractor
//! only accepts a complete bank corpus. Running it on a single row yields different
//! keywords than running it over the bank the row belongs to.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use tracing::debug;

use crate::config::PipelineSettings;

const MIN_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    top_n: usize,
    max_features: usize,
    ngram_range: RangeInclusive<usize>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(5, 1000, 1..=2)
    }
}

impl KeywordExtractor {
    pub fn new(top_n: usize, max_features: usize, ngram_range: RangeInclusive<usize>) -> Self {
        Self {
            top_n,
            max_features,
            ngram_range,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.top_n, settings.max_features, 1..=settings.ngram_max)
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Top keywords for every document of `corpus`, index-aligned with the input.
    pub fn extract<S: AsRef<str>>(&self, corpus: &[S]) -> Vec<Vec<Keyword>> {
        let documents: Vec<Vec<String>> = corpus.iter().map(|d| self.ngrams(d.as_ref())).collect();
        let vocabulary = self.vocabulary(&documents);
        let idf = inverse_document_frequency(&documents, &vocabulary, corpus.len());

        documents
            .iter()
            .enumerate()
            .map(|(index, terms)| {
                let keywords = self.rank(terms, &idf);
                if keywords.len() < self.top_n {
                    debug!(
                        document = index,
                        available = keywords.len(),
                        requested = self.top_n,
                        "Fewer keywords than requested"
                    );
                }
                keywords
            })
            .collect()
    }

    /// Term strings only; convenience over [`extract`](Self::extract).
    pub fn extract_terms<S: AsRef<str>>(&self, corpus: &[S]) -> Vec<Vec<String>> {
        self.extract(corpus)
            .into_iter()
            .map(|doc| doc.into_iter().map(|k| k.term).collect())
            .collect()
    }

    /// N-grams of `text` with repetitions, in document order.
    fn ngrams(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
            .collect();
        let mut terms = Vec::new();
        for n in self.ngram_range.clone().filter(|n| *n > 0) {
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }

    /// The `max_features` most frequent terms across the corpus; ties by term ascending.
    fn vocabulary(&self, documents: &[Vec<String>]) -> HashMap<String, usize> {
        let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for term in documents.iter().flatten() {
            *frequency.entry(term.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
        // stable sort keeps BTreeMap's ascending term order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_features);
        ranked
            .into_iter()
            .map(|(term, count)| (term.to_string(), count))
            .collect()
    }

    fn rank(&self, terms: &[String], idf: &HashMap<&str, f64>) -> Vec<Keyword> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for term in terms {
            if idf.contains_key(term.as_str()) {
                *counts.entry(term.as_str()).or_default() += 1;
            }
        }

        let mut weighted: Vec<Keyword> = counts
            .into_iter()
            .map(|(term, tf)| Keyword {
                term: term.to_string(),
                weight: tf as f64 * idf[term],
            })
            .collect();

        let norm = weighted.iter().map(|k| k.weight * k.weight).sum::<f64>().sqrt();
        if norm > 0.0 {
            for keyword in &mut weighted {
                keyword.weight /= norm;
            }
        }

        weighted.sort_by(compare_keywords);
        weighted.truncate(self.top_n);
        weighted
    }
}

/// Smoothed idf: ln((1 + n) / (1 + df)) + 1.
fn inverse_document_frequency<'a>(
    documents: &[Vec<String>],
    vocabulary: &'a HashMap<String, usize>,
    n_documents: usize,
) -> HashMap<&'a str, f64> {
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for terms in documents {
        let mut seen: Vec<&str> = terms.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for term in seen {
            if let Some((key, _)) = vocabulary.get_key_value(term) {
                *document_frequency.entry(key.as_str()).or_default() += 1;
            }
        }
    }

    let n = n_documents as f64;
    document_frequency
        .into_iter()
        .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
        .collect()
}

/// Descending weight, then ascending term.
fn compare_keywords(a: &Keyword, b: &Keyword) -> Ordering {
    b.weight.total_cmp(&a.weight).then_with(|| a.term.cmp(&b.term))
}
