//! Review text cleaning.
//!
//! Produces the token-reduced form the keyword extractor works on: lowercase,
//! alphabetic tokens only, English stop words removed, and each remaining word
//! reduced to a dictionary-style lemma ("crashing" -> "crash", "transfers" -> "transfer").
//!
//! The lemmatizer is rule based. It handles regular inflection (plural `-s`/`-es`/`-ies`,
//! `-ed`, `-ing`) with Porter-style guards so short stems are left alone, plus a
//! small table of irregular forms common in app reviews.

use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "be", "became", "because", "become", "becomes", "becoming", "been",
    "before", "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "but", "by", "ca", "call", "can", "cannot", "could", "did", "didn", "do", "does",
    "doesn", "doing", "don", "done", "down", "due", "during", "each", "either", "else",
    "elsewhere", "enough", "even", "ever", "every", "everyone", "everything", "everywhere",
    "except", "few", "first", "for", "former", "formerly", "from", "front", "full", "further",
    "get", "gets", "give", "go", "had", "has", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "i", "if", "in", "indeed", "into", "is", "isn", "it", "its", "itself", "just", "keep",
    "keeps", "last", "latter", "latterly", "least", "less", "ll", "made", "make", "many", "may",
    "me", "meanwhile", "might", "mine", "more", "moreover", "most", "mostly", "move", "much",
    "must", "my", "myself", "name", "namely", "neither", "never", "nevertheless", "next", "no",
    "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often",
    "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
    "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put", "quite",
    "rather", "re", "really", "regarding", "same", "say", "see", "seem", "seemed", "seeming",
    "seems", "serious", "several", "she", "should", "show", "side", "since", "so", "some",
    "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still", "such",
    "take", "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
    "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "this",
    "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too", "top",
    "toward", "towards", "under", "unless", "until", "up", "upon", "us", "used", "using",
    "various", "ve", "very", "via", "was", "wasn", "we", "well", "were", "what", "whatever",
    "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein",
    "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole",
    "whom", "whose", "why", "will", "with", "within", "without", "won", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

const IRREGULAR_LEMMAS: &[(&str, &str)] = &[
    ("bought", "buy"),
    ("brought", "bring"),
    ("came", "come"),
    ("children", "child"),
    ("felt", "feel"),
    ("found", "find"),
    ("gave", "give"),
    ("got", "get"),
    ("gotten", "get"),
    ("kept", "keep"),
    ("knew", "know"),
    ("left", "leave"),
    ("lost", "lose"),
    ("paid", "pay"),
    ("people", "person"),
    ("ran", "run"),
    ("said", "say"),
    ("sent", "send"),
    ("spent", "spend"),
    ("stuck", "stick"),
    ("taken", "take"),
    ("took", "take"),
    ("told", "tell"),
    ("went", "go"),
    ("worse", "bad"),
    ("worst", "bad"),
    ("wrote", "write"),
];

/// Words ending in `s` that are not plurals.
const S_EXCEPTIONS: &[&str] = &["always", "canvas", "news", "series"];

const MIN_TOKEN_CHARS: usize = 2;

/// Stateless after construction; share one instance across banks.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    stop_words: HashSet<String>,
    irregular: HashMap<String, String>,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            irregular: IRREGULAR_LEMMAS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Add extra stop words (lowercased).
    pub fn with_extra_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Cleaned tokens of `text`, in order.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
            .filter(|w| !self.is_stop_word(w))
            .map(|w| self.lemmatize(w))
            .filter(|lemma| !self.is_stop_word(lemma))
            .collect()
    }

    /// Cleaned text: tokens joined by single spaces.
    pub fn clean(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    /// Reduce a lowercase word to its lemma.
    pub fn lemmatize(&self, word: &str) -> String {
        if let Some(lemma) = self.irregular.get(word) {
            return lemma.clone();
        }
        if !word.is_ascii() || word.len() <= 3 {
            return word.to_string();
        }
        strip_plural(word)
            .or_else(|| strip_past(word))
            .or_else(|| strip_progressive(word))
            .unwrap_or_else(|| word.to_string())
    }
}

fn is_vowel(bytes: &[u8], i: usize) -> bool {
    match bytes[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => true,
        b'y' => i > 0 && !is_vowel(bytes, i - 1),
        _ => false,
    }
}

fn has_vowel(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    (0..bytes.len()).any(|i| is_vowel(bytes, i))
}

/// Porter measure: number of vowel-consonant sequences in the stem.
fn measure(stem: &str) -> usize {
    let bytes = stem.as_bytes();
    let mut m = 0;
    let mut prev_vowel = false;
    for i in 0..bytes.len() {
        let v = is_vowel(bytes, i);
        if prev_vowel && !v {
            m += 1;
        }
        prev_vowel = v;
    }
    m
}

/// consonant-vowel-consonant ending where the last consonant is not w, x or y
fn ends_cvc(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    n >= 3
        && !is_vowel(bytes, n - 3)
        && is_vowel(bytes, n - 2)
        && !is_vowel(bytes, n - 1)
        && !matches!(bytes[n - 1], b'w' | b'x' | b'y')
}

fn ends_double_consonant(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    n >= 2 && bytes[n - 1] == bytes[n - 2] && !is_vowel(bytes, n - 1)
}

fn strip_plural(word: &str) -> Option<String> {
    if !word.ends_with('s') || ["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return None;
    }
    if S_EXCEPTIONS.contains(&word) {
        return None;
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return Some(format!("{stem}y"));
    }
    for suffix in ["shes", "ches", "xes", "zes", "sses"] {
        if word.ends_with(suffix) {
            return Some(word[..word.len() - 2].to_string());
        }
    }
    Some(word[..word.len() - 1].to_string())
}

fn strip_past(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("eed") {
        return (measure(stem) > 0).then(|| format!("{stem}ee"));
    }
    let stem = word.strip_suffix("ed")?;
    if stem.len() < 3 || !has_vowel(stem) {
        return None;
    }
    if let Some(base) = stem.strip_suffix('i') {
        return Some(format!("{base}y"));
    }
    Some(restore_stem(stem))
}

fn strip_progressive(word: &str) -> Option<String> {
    let stem = word.strip_suffix("ing")?;
    if stem.len() < 2 || !has_vowel(stem) {
        return None;
    }
    Some(restore_stem(stem))
}

/// Undo spelling changes made when the suffix was attached.
fn restore_stem(stem: &str) -> String {
    if ["at", "bl", "iz", "us"].iter().any(|end| stem.ends_with(end)) {
        return format!("{stem}e");
    }
    if ends_double_consonant(stem) && !stem.ends_with(['l', 's', 'z']) {
        return stem[..stem.len() - 1].to_string();
    }
    if measure(stem) == 1 && ends_cvc(stem) {
        return format!("{stem}e");
    }
    stem.to_string()
}
