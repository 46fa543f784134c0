//! Keyword -> theme assignment.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::FALLBACK_THEME;

const BANKING_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "Account Access",
        &["login", "password", "otp", "pin", "account", "verification", "fingerprint", "sign"],
    ),
    (
        "Transactions",
        &["transfer", "payment", "transaction", "deposit", "withdraw", "balance", "money", "send"],
    ),
    (
        "Performance",
        &["crash", "slow", "load", "bug", "error", "freeze", "lag", "update", "speed"],
    ),
    (
        "User Interface",
        &["interface", "design", "ui", "easy", "navigation", "layout", "feature"],
    ),
    (
        "Customer Support",
        &["support", "service", "help", "customer", "response", "call"],
    ),
];

/// Keyword (one or more tokens) to theme name. Keys are stored lowercase and
/// pre-split so matching is a token-window comparison.
#[derive(Debug, Clone, Default)]
pub struct ThemeMap {
    entries: BTreeMap<String, String>,
}

impl ThemeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: &str, theme: &str) {
        let key = normalize_key(keyword);
        if !key.is_empty() {
            self.entries.insert(key, theme.trim().to_string());
        }
    }

    /// Default taxonomy for mobile-banking reviews.
    pub fn banking_default() -> Self {
        BANKING_TAXONOMY
            .iter()
            .flat_map(|(theme, keys)| keys.iter().map(move |k| (*k, *theme)))
            .collect()
    }

    /// Configured table, or the banking default when the table is empty.
    pub fn from_config(themes: &BTreeMap<String, String>) -> Self {
        if themes.is_empty() {
            return Self::banking_default();
        }
        themes.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    pub fn theme_for(&self, keyword: &str) -> Option<&str> {
        self.entries.get(&normalize_key(keyword)).map(String::as_str)
    }

    /// Distinct theme names, sorted.
    pub fn themes(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ThemeMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut map = ThemeMap::new();
        for (keyword, theme) in iter {
            map.insert(keyword, theme);
        }
        map
    }
}

fn normalize_key(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Themes for one review's keywords; `{"Other"}` when nothing matches.
pub fn map_keywords<S: AsRef<str>>(keywords: &[S], theme_map: &ThemeMap) -> BTreeSet<String> {
    let mut themes = BTreeSet::new();
    for keyword in keywords {
        let tokens: Vec<String> = keyword
            .as_ref()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        for (key, theme) in theme_map.iter() {
            if contains_run(&tokens, key) {
                themes.insert(theme.to_string());
            }
        }
    }
    if themes.is_empty() {
        themes.insert(FALLBACK_THEME.to_string());
    }
    themes
}

/// True when the tokens of `key` appear as a contiguous run of `tokens`.
fn contains_run(tokens: &[String], key: &str) -> bool {
    let key_tokens: Vec<&str> = key.split(' ').collect();
    tokens
        .windows(key_tokens.len())
        .any(|window| window.iter().zip(&key_tokens).all(|(t, k)| t == k))
}

/// Up to `max_examples` texts per theme, in input order.
pub fn examples_by_theme<'a, I>(reviews: I, max_examples: usize) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
{
    let mut examples: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (text, themes) in reviews {
        for theme in themes {
            let bucket = examples.entry(theme.clone()).or_default();
            if bucket.len() < max_examples {
                bucket.push(text.to_string());
            }
        }
    }
    examples.retain(|_, texts| !texts.is_empty());
    examples
}

/// Reviews per theme, excluding the fallback theme.
pub fn theme_counts<'a, I>(theme_sets: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let mut counts = BTreeMap::new();
    for theme in theme_sets.into_iter().flatten() {
        if theme != FALLBACK_THEME {
            *counts.entry(theme.clone()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_whole_token_matching() {
        let map = ThemeMap::banking_default();
        assert_eq!(map_keywords(&["love transfer"], &map), set(&["Transactions"]));
        assert_eq!(
            map_keywords(&["app crash", "login"], &map),
            set(&["Account Access", "Performance"])
        );
        // "ui" must not match inside "build", nor "pin" inside "spinning"
        assert_eq!(map_keywords(&["build", "spinning"], &map), set(&["Other"]));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let map: ThemeMap = [("Mobile Data", "Connectivity")].into_iter().collect();
        assert_eq!(map_keywords(&["poor MOBILE data"], &map), set(&["Connectivity"]));
        assert_eq!(map_keywords(&["mobile"], &map), set(&["Other"]));
        assert_eq!(map.theme_for("mobile   DATA"), Some("Connectivity"));
    }

    #[test]
    fn test_never_empty() {
        let map = ThemeMap::banking_default();
        let empty: [&str; 0] = [];
        assert_eq!(map_keywords(&empty, &map), set(&["Other"]));
        assert_eq!(map_keywords(&["great"], &ThemeMap::new()), set(&["Other"]));
    }

    #[test]
    fn test_from_config_falls_back_to_default() {
        let default = ThemeMap::from_config(&BTreeMap::new());
        assert_eq!(default.theme_for("otp"), Some("Account Access"));
        assert_eq!(default.themes().len(), 5);

        let mut custom = BTreeMap::new();
        custom.insert("telebirr".to_string(), "Integrations".to_string());
        let map = ThemeMap::from_config(&custom);
        assert_eq!(map.len(), 1);
        assert_eq!(map.theme_for("otp"), None);
    }

    #[test]
    fn test_examples_and_counts() {
        let a = set(&["Performance"]);
        let b = set(&["Performance", "Account Access"]);
        let c = set(&["Other"]);
        let reviews = vec![("slow", &a), ("crash on login", &b), ("meh", &c)];

        let examples = examples_by_theme(reviews.iter().copied(), 1);
        assert_eq!(examples["Performance"], vec!["slow".to_string()]);
        assert_eq!(examples["Account Access"], vec!["crash on login".to_string()]);
        assert_eq!(examples["Other"], vec!["meh".to_string()]);

        let counts = theme_counts([&a, &b, &c]);
        assert_eq!(counts.get("Performance"), Some(&2));
        assert_eq!(counts.get("Account Access"), Some(&1));
        assert!(!counts.contains_key("Other"));
    }
}
