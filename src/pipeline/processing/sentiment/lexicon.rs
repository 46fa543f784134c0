//! Sentiment lexicon: word -> valence on VADER's -4..+4 scale.
//!
//! A built-in lexicon covers general opinion words plus vocabulary that shows up in
//! banking-app reviews ("crash", "freeze", "scam"). A full VADER-format file can be
//! loaded instead: one entry per line, `token<TAB>mean[<TAB>...]`; extra columns are ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

const BUILTIN_LEXICON: &[(&str, f64)] = &[
    // positive
    ("amazing", 2.8),
    ("appreciate", 2.2),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("better", 1.9),
    ("brilliant", 2.8),
    ("comfortable", 1.5),
    ("convenient", 1.9),
    ("cool", 1.3),
    ("easy", 1.9),
    ("efficient", 1.8),
    ("excellent", 3.2),
    ("fantastic", 2.6),
    ("fast", 1.4),
    ("fine", 0.8),
    ("fixed", 1.1),
    ("free", 1.1),
    ("friendly", 2.2),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("help", 1.7),
    ("helpful", 1.8),
    ("improved", 2.1),
    ("like", 1.5),
    ("liked", 1.8),
    ("love", 3.2),
    ("loved", 2.9),
    ("lovely", 2.8),
    ("nice", 1.8),
    ("ok", 0.9),
    ("okay", 0.9),
    ("perfect", 2.7),
    ("pleasant", 2.3),
    ("quick", 1.1),
    ("recommend", 1.5),
    ("reliable", 1.9),
    ("safe", 1.9),
    ("satisfied", 1.8),
    ("secure", 1.4),
    ("simple", 1.0),
    ("smooth", 1.7),
    ("super", 2.9),
    ("thank", 1.5),
    ("thanks", 1.9),
    ("useful", 1.9),
    ("win", 2.8),
    ("wonderful", 2.7),
    ("works", 0.9),
    ("wow", 2.8),
    // negative
    ("annoying", -2.3),
    ("awful", -2.0),
    ("bad", -2.5),
    ("broken", -2.1),
    ("bug", -1.7),
    ("buggy", -1.8),
    ("bugs", -1.7),
    ("cheat", -2.0),
    ("complicated", -1.2),
    ("confusing", -1.3),
    ("crap", -1.6),
    ("crash", -1.7),
    ("crashed", -1.7),
    ("crashes", -1.7),
    ("crashing", -1.7),
    ("declined", -1.3),
    ("delay", -1.3),
    ("delayed", -1.3),
    ("difficult", -1.5),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("disgusting", -2.4),
    ("error", -1.7),
    ("errors", -1.7),
    ("fail", -2.5),
    ("failed", -2.3),
    ("fails", -2.3),
    ("failure", -2.3),
    ("fraud", -2.8),
    ("freeze", -1.2),
    ("freezes", -1.2),
    ("frustrated", -2.1),
    ("frustrating", -1.9),
    ("garbage", -2.1),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("issue", -0.8),
    ("issues", -0.8),
    ("lag", -1.2),
    ("lost", -1.3),
    ("poor", -2.1),
    ("problem", -1.7),
    ("problems", -1.7),
    ("rubbish", -2.0),
    ("sad", -2.1),
    ("scam", -2.6),
    ("slow", -1.2),
    ("stuck", -1.4),
    ("terrible", -2.1),
    ("trouble", -1.7),
    ("ugly", -2.3),
    ("unable", -1.2),
    ("unreliable", -1.9),
    ("useless", -1.8),
    ("waste", -1.8),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -2.1),
];

/// Immutable token -> valence table. Construct once and share by reference.
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: HashMap<String, f64>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_LEXICON.iter().map(|(t, v)| (t.to_string(), *v)))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(token, valence)| (token.to_lowercase(), valence))
                .collect(),
        }
    }

    /// Parse VADER-format text. Blank lines are skipped; malformed lines are
    /// logged and skipped; an input with no usable entry is an error.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut columns = line.split('\t');
            let token = columns.next().map(str::trim).unwrap_or_default();
            let valence = columns.next().and_then(|v| v.trim().parse::<f64>().ok());
            match valence {
                Some(v) if !token.is_empty() && v.is_finite() => {
                    entries.insert(token.to_lowercase(), v);
                }
                _ => warn!(line = line_no + 1, "Skipping malformed lexicon line"),
            }
        }
        if entries.is_empty() {
            return Err(PipelineError::Config("lexicon contains no entries".to_string()));
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read lexicon '{}': {}", path.display(), e))
        })?;
        let lexicon = Self::parse(&content)?;
        info!(path = %path.display(), entries = lexicon.len(), "Loaded sentiment lexicon");
        Ok(lexicon)
    }

    pub fn valence(&self, token: &str) -> Option<f64> {
        self.entries.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_review_vocabulary() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.valence("great").unwrap() > 0.0);
        assert!(lexicon.valence("crashing").unwrap() < 0.0);
        assert_eq!(lexicon.valence("transfer"), None);
    }

    #[test]
    fn test_parse_vader_format() {
        let content = "good\t1.9\t0.9434\t[2, 2, 1]\n\nbad\t-2.5\t0.67\n:)\t2.0\nbroken line\n";
        let lexicon = Lexicon::parse(content).unwrap();
        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.valence("bad"), Some(-2.5));
        assert_eq!(lexicon.valence(":)"), Some(2.0));
    }

    #[test]
    fn test_parse_rejects_empty_lexicon() {
        assert!(Lexicon::parse("nothing useful here").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.txt");
        std::fs::write(&path, "superb\t3.0\n").unwrap();
        let lexicon = Lexicon::load(&path).unwrap();
        assert_eq!(lexicon.valence("superb"), Some(3.0));
    }
}
