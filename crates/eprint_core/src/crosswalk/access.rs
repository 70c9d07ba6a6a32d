//! Record visibility.

use crate::model::record::STATUS_ARCHIVE;
use crate::model::Record;

const WITHHELD_REVIEW_STATES: &[&str] = &["review", "withheld", "gradoffice", "notapproved"];

/// A record is public when archived, shown, and not held back by review.
pub fn is_public(record: &Record) -> bool {
    record.eprint_status == STATUS_ARCHIVE
        && record.metadata_visibility == "show"
        && !WITHHELD_REVIEW_STATES.contains(&record.review_status.as_str())
}

#[cfg(test)]
mod tests {
    use super::is_public;
    use crate::model::Record;

    fn record(status: &str, visibility: &str, review: &str) -> Record {
        Record {
            eprint_status: status.to_string(),
            metadata_visibility: visibility.to_string(),
            review_status: review.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn archived_and_shown_records_are_public() {
        assert!(is_public(&record("archive", "show", "")));
        assert!(is_public(&record("archive", "show", "approved")));
    }

    #[test]
    fn any_failing_condition_restricts() {
        assert!(!is_public(&record("buffer", "show", "")));
        assert!(!is_public(&record("archive", "no_search", "")));
        assert!(!is_public(&record("archive", "show", "withheld")));
        assert!(!is_public(&record("deletion", "show", "")));
    }
}
