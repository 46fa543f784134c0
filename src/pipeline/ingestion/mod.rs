// Pipeline ingestion: reading raw review exports and validating them

pub mod csv_source;
pub mod validation;

pub use csv_source::{read_reviews, CsvReviewSource};
pub use validation::{validate_dataset, DatasetValidation};
