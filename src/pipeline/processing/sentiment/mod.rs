//! Lexicon and rule based sentiment scoring (VADER style).
//!
//! Each token's valence comes from the [`Lexicon`]; the surrounding tokens then adjust it:
//! intensity boosters and dampeners, negation, ALL-CAPS emphasis and a contrastive "but".
//! The summed valence is squashed into a compound score in [-1, 1] and labelled with
//! the configured thresholds. Scoring is pure; the lexicon is shared read-only.

pub mod lexicon;

pub use lexicon::Lexicon;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SentimentSettings;
use crate::error::Result;
use crate::types::{SentimentLabel, SentimentScore};

const BOOST_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const BUT_BEFORE_SCALAR: f64 = 0.5;
const BUT_AFTER_SCALAR: f64 = 1.5;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const QUESTION_INCREMENT: f64 = 0.18;
const MAX_QUESTION_EMPHASIS: f64 = 0.96;
const NORMALIZATION_ALPHA: f64 = 15.0;
/// Decay applied to a booster 1, 2 and 3 tokens before the scored word.
const BOOST_DECAY: [f64; 3] = [1.0, 0.95, 0.9];

const NEGATORS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither", "never", "none", "nope", "nor",
    "not", "nothing", "nowhere", "shouldnt", "wasnt", "werent", "without", "wont", "wouldnt",
    "rarely", "seldom", "despite",
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOST_INCREMENT),
    ("amazingly", BOOST_INCREMENT),
    ("completely", BOOST_INCREMENT),
    ("considerably", BOOST_INCREMENT),
    ("decidedly", BOOST_INCREMENT),
    ("deeply", BOOST_INCREMENT),
    ("enormously", BOOST_INCREMENT),
    ("entirely", BOOST_INCREMENT),
    ("especially", BOOST_INCREMENT),
    ("exceptionally", BOOST_INCREMENT),
    ("extremely", BOOST_INCREMENT),
    ("fully", BOOST_INCREMENT),
    ("greatly", BOOST_INCREMENT),
    ("highly", BOOST_INCREMENT),
    ("hugely", BOOST_INCREMENT),
    ("incredibly", BOOST_INCREMENT),
    ("intensely", BOOST_INCREMENT),
    ("majorly", BOOST_INCREMENT),
    ("more", BOOST_INCREMENT),
    ("most", BOOST_INCREMENT),
    ("particularly", BOOST_INCREMENT),
    ("purely", BOOST_INCREMENT),
    ("quite", BOOST_INCREMENT),
    ("really", BOOST_INCREMENT),
    ("remarkably", BOOST_INCREMENT),
    ("so", BOOST_INCREMENT),
    ("substantially", BOOST_INCREMENT),
    ("thoroughly", BOOST_INCREMENT),
    ("totally", BOOST_INCREMENT),
    ("tremendously", BOOST_INCREMENT),
    ("truly", BOOST_INCREMENT),
    ("utterly", BOOST_INCREMENT),
    ("very", BOOST_INCREMENT),
    ("almost", -BOOST_INCREMENT),
    ("barely", -BOOST_INCREMENT),
    ("hardly", -BOOST_INCREMENT),
    ("less", -BOOST_INCREMENT),
    ("little", -BOOST_INCREMENT),
    ("marginally", -BOOST_INCREMENT),
    ("occasionally", -BOOST_INCREMENT),
    ("partly", -BOOST_INCREMENT),
    ("scarcely", -BOOST_INCREMENT),
    ("slightly", -BOOST_INCREMENT),
    ("somewhat", -BOOST_INCREMENT),
];

/// One whitespace token with surrounding punctuation stripped.
struct Token<'a> {
    raw: &'a str,
    lower: String,
}

impl Token<'_> {
    fn is_upper(&self) -> bool {
        self.raw.chars().any(char::is_alphabetic) && !self.raw.chars().any(char::is_lowercase)
    }

    /// Lowercase form with apostrophes dropped, so "don't" and "dont" compare equal.
    fn bare(&self) -> String {
        self.lower.replace(['\'', '\u{2019}'], "")
    }
}

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: Arc<Lexicon>,
    boosters: HashMap<&'static str, f64>,
    positive_threshold: f64,
    negative_threshold: f64,
}

impl SentimentScorer {
    pub fn new(lexicon: Arc<Lexicon>, positive_threshold: f64, negative_threshold: f64) -> Self {
        Self {
            lexicon,
            boosters: BOOSTERS.iter().copied().collect(),
            positive_threshold,
            negative_threshold,
        }
    }

    /// Build from settings, loading the lexicon file when one is configured.
    pub fn from_settings(settings: &SentimentSettings) -> Result<Self> {
        let lexicon = match &settings.lexicon_path {
            Some(path) => Lexicon::load(path)?,
            None => Lexicon::builtin(),
        };
        Ok(Self::new(
            Arc::new(lexicon),
            settings.positive_threshold,
            settings.negative_threshold,
        ))
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    pub fn label_for(&self, score: f64) -> SentimentLabel {
        if score > self.positive_threshold {
            SentimentLabel::Positive
        } else if score < self.negative_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn predict(&self, text: &str) -> SentimentScore {
        let score = self.compound(text);
        SentimentScore {
            label: self.label_for(score),
            score,
        }
    }

    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SentimentScore> {
        texts.iter().map(|t| self.predict(t.as_ref())).collect()
    }

    /// Compound polarity in [-1, 1]; 0.0 when no token carries sentiment.
    pub fn compound(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }
        let mixed_case = tokens.iter().any(Token::is_upper) && !tokens.iter().all(Token::is_upper);

        let mut valences: Vec<f64> = (0..tokens.len())
            .map(|i| self.token_valence(&tokens, i, mixed_case))
            .collect();
        apply_but_rule(&tokens, &mut valences);

        let sum: f64 = valences.iter().sum();
        if sum == 0.0 {
            return 0.0;
        }
        let emphasis = punctuation_emphasis(text);
        let total = if sum > 0.0 { sum + emphasis } else { sum - emphasis };
        normalize(total)
    }

    fn token_valence(&self, tokens: &[Token<'_>], i: usize, mixed_case: bool) -> f64 {
        let token = &tokens[i];
        if self.boosters.contains_key(token.lower.as_str()) {
            return 0.0;
        }
        let Some(base) = self.lexicon.valence(&token.lower) else {
            return 0.0;
        };

        let mut valence = base;
        if mixed_case && token.is_upper() {
            valence += CAPS_INCREMENT.copysign(base);
        }

        for (distance, decay) in BOOST_DECAY.iter().enumerate() {
            let Some(j) = i.checked_sub(distance + 1) else {
                break;
            };
            let prior = &tokens[j];
            if self.lexicon.valence(&prior.lower).is_none() {
                valence += self.booster_scalar(prior, valence, mixed_case) * decay;
            }
            if is_negator(prior) {
                valence *= NEGATION_SCALAR;
            }
        }
        valence
    }

    fn booster_scalar(&self, prior: &Token<'_>, valence: f64, mixed_case: bool) -> f64 {
        let Some(&increment) = self.boosters.get(prior.lower.as_str()) else {
            return 0.0;
        };
        let mut scalar = increment;
        if mixed_case && prior.is_upper() {
            scalar += CAPS_INCREMENT.copysign(increment);
        }
        if valence < 0.0 {
            -scalar
        } else {
            scalar
        }
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(|raw| Token {
            raw,
            lower: raw.to_lowercase(),
        })
        .collect()
}

fn is_negator(token: &Token<'_>) -> bool {
    token.lower.contains("n't") || NEGATORS.contains(&token.bare().as_str())
}

/// Valences before the first "but" are damped; those after it are amplified.
fn apply_but_rule(tokens: &[Token<'_>], valences: &mut [f64]) {
    let Some(pivot) = tokens.iter().position(|t| t.lower == "but") else {
        return;
    };
    for (i, valence) in valences.iter_mut().enumerate() {
        if i < pivot {
            *valence *= BUT_BEFORE_SCALAR;
        } else if i > pivot {
            *valence *= BUT_AFTER_SCALAR;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();
    let question_emphasis = if questions > 1 {
        (questions as f64 * QUESTION_INCREMENT).min(MAX_QUESTION_EMPHASIS)
    } else {
        0.0
    };
    exclamations as f64 * EXCLAMATION_INCREMENT + question_emphasis
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}
