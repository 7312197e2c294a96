use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::Well;
use crate::error::NormalizeError;

// ---------------------------------------------------------------------------
// Column filter: which wells take part in normalization
// ---------------------------------------------------------------------------

/// Selects wells by letter group and an inclusive number range, e.g.
/// letters `{A, B}` with `1..=6` keeps `A1..A6` and `B1..B6`.
///
/// Deserializing goes through [`ColumnFilter::new`], so letters read from a
/// config file are upper-cased and checked like parsed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnFilter")]
pub struct ColumnFilter {
    pub letters: BTreeSet<String>,
    pub range_start: u32,
    pub range_end: u32,
}

#[derive(Deserialize)]
struct RawColumnFilter {
    letters: Vec<String>,
    range_start: u32,
    range_end: u32,
}

impl TryFrom<RawColumnFilter> for ColumnFilter {
    type Error = NormalizeError;

    fn try_from(raw: RawColumnFilter) -> Result<Self, Self::Error> {
        ColumnFilter::new(raw.letters, raw.range_start, raw.range_end)
    }
}

impl ColumnFilter {
    pub fn new<I, S>(letters: I, range_start: u32, range_end: u32) -> Result<Self, NormalizeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = ColumnFilter {
            letters: letters
                .into_iter()
                .map(|l| l.as_ref().trim().to_ascii_uppercase())
                .collect(),
            range_start,
            range_end,
        };
        filter.validate()?;
        Ok(filter)
    }

    /// Parse the textual form: letters as a comma/space separated list
    /// (`"A, B,C"`), range as `"start-end"` or a single number.
    pub fn parse(letters: &str, range: &str) -> Result<Self, NormalizeError> {
        let letter_set: Vec<&str> = letters
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if letter_set.is_empty() {
            return Err(NormalizeError::InvalidLetters(letters.to_string()));
        }

        let bad_range = || NormalizeError::InvalidRange(range.to_string());
        let bound = |s: &str| s.trim().parse::<u32>().map_err(|_| bad_range());
        let (start, end) = match range.trim().split_once('-') {
            Some((a, b)) => (bound(a)?, bound(b)?),
            None => {
                let n = bound(range)?;
                (n, n)
            }
        };

        ColumnFilter::new(letter_set, start, end)
    }

    /// Check a filter built by hand or deserialized from a config file.
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.letters.is_empty() {
            return Err(NormalizeError::InvalidLetters(String::new()));
        }
        if let Some(bad) = self
            .letters
            .iter()
            .find(|l| l.is_empty() || !l.bytes().all(|b| b.is_ascii_alphabetic()))
        {
            return Err(NormalizeError::InvalidLetters(bad.clone()));
        }
        if self.range_start == 0 || self.range_start > self.range_end {
            return Err(NormalizeError::InvalidRange(format!(
                "{}-{}",
                self.range_start, self.range_end
            )));
        }
        Ok(())
    }

    /// A well passes when its letter group is selected and its number is in range.
    pub fn matches(&self, well: &Well) -> bool {
        self.letters
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&well.letters))
            && (self.range_start..=self.range_end).contains(&well.number)
    }
}

/// Return indices of the labels that pass the filter, in their original order.
///
/// * No filter → every label.
/// * Labels that are not well identifiers never pass an active filter.
/// * An active filter that keeps nothing is an error.
pub fn selected_indices(
    labels: &[String],
    filter: Option<&ColumnFilter>,
) -> Result<Vec<usize>, NormalizeError> {
    let Some(filter) = filter else {
        return Ok((0..labels.len()).collect());
    };
    filter.validate()?;

    let selected: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| Well::parse(label).is_some_and(|w| filter.matches(&w)))
        .map(|(i, _)| i)
        .collect();

    if selected.is_empty() {
        return Err(NormalizeError::NoWellsSelected {
            available: labels.len(),
        });
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_accepts_lists_and_ranges() {
        let f = ColumnFilter::parse("a, B,c", "2-4").unwrap();
        let expected: BTreeSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(f.letters, expected);
        assert_eq!((f.range_start, f.range_end), (2, 4));

        let single = ColumnFilter::parse("D", " 7 ").unwrap();
        assert_eq!((single.range_start, single.range_end), (7, 7));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            ColumnFilter::parse("", "1-12"),
            Err(NormalizeError::InvalidLetters(_))
        ));
        assert!(matches!(
            ColumnFilter::parse("A1", "1-12"),
            Err(NormalizeError::InvalidLetters(_))
        ));
        assert!(matches!(
            ColumnFilter::parse("A", "one-12"),
            Err(NormalizeError::InvalidRange(_))
        ));
        assert!(matches!(
            ColumnFilter::parse("A", "9-3"),
            Err(NormalizeError::InvalidRange(_))
        ));
        assert!(matches!(
            ColumnFilter::parse("A", "0-3"),
            Err(NormalizeError::InvalidRange(_))
        ));
    }

    #[test]
    fn selection_is_intersection_in_source_order() {
        let wells = labels(&["B2", "A1", "A3", "C1", "A2", "Blank"]);
        let f = ColumnFilter::new(["A", "B"], 1, 2).unwrap();
        assert_eq!(selected_indices(&wells, Some(&f)).unwrap(), vec![0, 1, 4]);
        assert_eq!(selected_indices(&wells, None).unwrap().len(), 6);
    }

    #[test]
    fn config_letters_are_case_insensitive() {
        let f: ColumnFilter =
            serde_json::from_str(r#"{"letters": ["a", " b "], "range_start": 1, "range_end": 12}"#)
                .unwrap();
        let expected: BTreeSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(f.letters, expected);
        assert_eq!(selected_indices(&labels(&["A1", "C1"]), Some(&f)).unwrap(), vec![0]);

        let by_hand = ColumnFilter {
            letters: ["h".to_string()].into_iter().collect(),
            range_start: 1,
            range_end: 12,
        };
        assert!(by_hand.matches(&Well::parse("H3").unwrap()));
    }

    #[test]
    fn config_filter_is_validated_on_load() {
        let empty = serde_json::from_str::<ColumnFilter>(
            r#"{"letters": [], "range_start": 1, "range_end": 12}"#,
        );
        assert!(empty.is_err());
        let reversed = serde_json::from_str::<ColumnFilter>(
            r#"{"letters": ["A"], "range_start": 9, "range_end": 3}"#,
        );
        assert!(reversed.is_err());
    }

    #[test]
    fn empty_selection_fails() {
        let wells = labels(&["A1", "A2"]);
        let f = ColumnFilter::new(["H"], 1, 12).unwrap();
        assert_eq!(
            selected_indices(&wells, Some(&f)),
            Err(NormalizeError::NoWellsSelected { available: 2 })
        );
    }
}
