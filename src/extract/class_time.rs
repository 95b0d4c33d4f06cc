use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::candidate::Signal;
use crate::coordinate::Component;
use crate::ingest::ClassEntry;

const MIN_PERCENT_FOR_SCORE: usize = 60;

/// Proposes the most common class date as a `yyyy.MM.dd` version.
pub fn analyze(classes: &[ClassEntry]) -> Vec<Signal> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut total = 0usize;
    for timestamp in classes.iter().filter_map(|c| c.timestamp) {
        *per_day.entry(timestamp.date_naive()).or_default() += 1;
        total += 1;
    }

    // Earliest day wins a tie.
    let Some((day, count)) = per_day
        .into_iter()
        .fold(None, |best: Option<(NaiveDate, usize)>, (day, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((day, count)),
        })
    else {
        return Vec::new();
    };
    if count <= 1 {
        return Vec::new();
    }

    let percent = count * 100 / total;
    let score = i32::from(percent > MIN_PERCENT_FOR_SCORE);
    vec![Signal::new(
        Component::Version,
        day.format("%Y.%m.%d").to_string(),
        score,
        format!(
            "{percent:>3}% of classes have created/modified date: {}",
            day.format("%Y-%m-%d")
        ),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn class_at(day: u32, hour: u32) -> ClassEntry {
        ClassEntry {
            path: format!("a/C{day}{hour}.class"),
            timestamp: Utc.with_ymd_and_hms(2021, 3, day, hour, 0, 0).single(),
        }
    }

    #[test]
    fn dominant_day_scores_one() {
        let signals = analyze(&[class_at(4, 1), class_at(4, 23), class_at(4, 12), class_at(5, 1)]);
        assert_eq!(
            signals,
            vec![Signal::new(
                Component::Version,
                "2021.03.04",
                1,
                " 75% of classes have created/modified date: 2021-03-04"
            )]
        );
    }

    #[test]
    fn weak_majority_is_recorded_with_zero_score() {
        let signals = analyze(&[class_at(4, 1), class_at(4, 2), class_at(5, 1), class_at(6, 1)]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].score, 0);
        assert!(signals[0].detail.starts_with(" 50%"));
    }

    #[test]
    fn single_class_per_day_proposes_nothing() {
        assert!(analyze(&[class_at(4, 1), class_at(5, 1)]).is_empty());
        assert!(analyze(&[]).is_empty());
    }
}
