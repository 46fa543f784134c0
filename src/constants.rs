/// Shared constants for bank names, file layout and column naming.
/// The bank list mirrors the default `[[banks]]` section of the configuration.

// Human-readable bank names (used in CLI and output)
pub const CBE_BANK: &str = "Commercial Bank of Ethiopia";
pub const BOA_BANK: &str = "Bank of Abyssinia";
pub const DASHEN_BANK: &str = "Dashen Bank";

// Expected raw review files under the data directory
pub const CBE_FILE: &str = "commercial_bank_of_ethiopia_reviews.csv";
pub const BOA_FILE: &str = "bank_of_abyssinia_reviews.csv";
pub const DASHEN_FILE: &str = "dashen_bank_reviews.csv";

/// Source recorded when the scraper omitted one.
pub const DEFAULT_SOURCE: &str = "Google Play";

/// Theme assigned when no keyword matches the taxonomy.
pub const FALLBACK_THEME: &str = "Other";

/// Separator for list-valued columns in CSV and SQL output.
pub const LIST_SEPARATOR: &str = ", ";

/// Columns a raw review file must carry (aliases are resolved by the CSV source).
pub const REQUIRED_COLUMNS: [&str; 5] = ["review_text", "rating", "date", "bank_name", "source"];

/// Suffix for enriched per-bank output files.
pub const ENRICHED_SUFFIX: &str = "_with_sentiment_themes.csv";

/// File name of the combined summary table.
pub const SUMMARY_FILE: &str = "sentiment_by_rating.csv";

/// Default (bank name, file name) pairs.
pub fn default_banks() -> Vec<(&'static str, &'static str)> {
    vec![(CBE_BANK, CBE_FILE), (BOA_BANK, BOA_FILE), (DASHEN_BANK, DASHEN_FILE)]
}

/// Convert a bank name to the slug used in file names, e.g. "Dashen Bank" -> "dashen_bank".
pub fn bank_slug(bank: &str) -> String {
    bank.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_slug() {
        assert_eq!(bank_slug("Commercial Bank of Ethiopia"), "commercial_bank_of_ethiopia");
        assert_eq!(bank_slug("  BOA "), "boa");
        assert_eq!(bank_slug("Dashen-Bank (S.C.)"), "dashen_bank_s_c");
    }
}
