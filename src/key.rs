//! Decomposition of compound metric keys such as
//! `"4 et plus.après 1990.non meuble.loyer_reference_majore"`.
//!
//! Two strategies are provided. [`CompoundKey::split`] splits positionally on
//! the separator and resolves each segment against its vocabulary.
//! [`KeyClassifier`] tests the key against one regex per category value and
//! requires exactly one hit per dimension. Both yield the same [`CompoundKey`]
//! for well-formed keys.

use std::{fmt, sync::Arc};

use regex::Regex;

use crate::{
    bucket::{Bucket, BucketTuple, ConstructionEra, Furnishing, RoomCount},
    error::KeyError,
    query::FilterSelection,
};

pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundKey {
    pub tuple: BucketTuple,
    pub metric: Arc<str>,
}

impl CompoundKey {
    /// Split mode: exactly four non-empty segments, buckets resolved by exact key.
    pub fn split(key: &str) -> Result<Self, KeyError> {
        let segments: Vec<&str> = key.split(SEPARATOR).collect();
        if segments.len() != 4 {
            return Err(KeyError::SegmentCount { key: key.to_string(), found: segments.len() });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(KeyError::EmptySegment { key: key.to_string() });
        }

        Ok(Self {
            tuple: BucketTuple::new(
                resolve::<RoomCount>(key, segments[0])?,
                resolve::<ConstructionEra>(key, segments[1])?,
                resolve::<Furnishing>(key, segments[2])?,
            ),
            metric: Arc::from(segments[3]),
        })
    }

    #[inline] pub fn rooms(&self) -> RoomCount { self.tuple.rooms }
    #[inline] pub fn era(&self) -> ConstructionEra { self.tuple.era }
    #[inline] pub fn furnishing(&self) -> Furnishing { self.tuple.furnishing }
    #[inline] pub fn metric(&self) -> &str { &self.metric }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.tuple, self.metric)
    }
}

fn resolve<B: Bucket>(key: &str, segment: &str) -> Result<B, KeyError> {
    B::from_key(segment).ok_or_else(|| KeyError::UnknownBucket {
        key: key.to_string(),
        dimension: B::DIMENSION,
        value: segment.to_string(),
    })
}

/// One compiled pattern per category value of a dimension.
#[derive(Debug)]
struct PatternSet<B: Bucket> {
    patterns: Vec<(B, Regex)>,
}

impl<B: Bucket> PatternSet<B> {
    /// `position` is the number of segments preceding this dimension.
    fn new(position: usize) -> Self {
        let prefix = r"[^.]+\.".repeat(position);
        let patterns = B::all().iter()
            .map(|&b| {
                let pattern = format!(r"^{prefix}{}\.", regex::escape(b.key()));
                // Patterns are built from the fixed vocabulary, so compilation cannot fail.
                (b, Regex::new(&pattern).expect("bucket pattern is a valid regex"))
            })
            .collect();
        Self { patterns }
    }

    /// Anchored per-position patterns over the fixed vocabulary never overlap,
    /// so `Ambiguous` only arises from a hand-built overlapping set.
    fn classify(&self, key: &str) -> Result<B, KeyError> {
        let hits: Vec<B> = self.patterns.iter()
            .filter(|(_, re)| re.is_match(key))
            .map(|(b, _)| *b)
            .collect();

        match hits.as_slice() {
            [b] => Ok(*b),
            [] => Err(KeyError::Unmatched { key: key.to_string(), dimension: B::DIMENSION }),
            _ => Err(KeyError::Ambiguous {
                key: key.to_string(),
                dimension: B::DIMENSION,
                candidates: hits.iter().map(|b| b.key()).collect(),
            }),
        }
    }

    fn matches_any(&self, key: &str, selected: impl Fn(&B) -> bool) -> bool {
        self.patterns.iter().any(|(b, re)| selected(b) && re.is_match(key))
    }
}

/// Pattern-match mode classifier.
#[derive(Debug)]
pub struct KeyClassifier {
    rooms: PatternSet<RoomCount>,
    eras: PatternSet<ConstructionEra>,
    furnishings: PatternSet<Furnishing>,
    metric: Regex,
}

impl Default for KeyClassifier {
    fn default() -> Self { Self::new() }
}

impl KeyClassifier {
    pub fn new() -> Self {
        Self {
            rooms: PatternSet::new(0),
            eras: PatternSet::new(1),
            furnishings: PatternSet::new(2),
            metric: Regex::new(r"^[^.]+\.[^.]+\.[^.]+\.([^.]+)$").expect("metric pattern is a valid regex"),
        }
    }

    /// Classify a key by testing it against every category pattern.
    pub fn classify(&self, key: &str) -> Result<CompoundKey, KeyError> {
        let rooms = self.rooms.classify(key)?;
        let era = self.eras.classify(key)?;
        let furnishing = self.furnishings.classify(key)?;
        let metric = self.metric.captures(key)
            .and_then(|c| c.get(1))
            .ok_or_else(|| KeyError::SegmentCount { key: key.to_string(), found: key.split(SEPARATOR).count() })?;

        Ok(CompoundKey {
            tuple: BucketTuple::new(rooms, era, furnishing),
            metric: Arc::from(metric.as_str()),
        })
    }

    /// Boolean column selection: does `key` carry `metric` for a bucket
    /// combination inside `selection`?
    pub fn matches(&self, key: &str, selection: &FilterSelection, metric: &str) -> bool {
        self.metric.captures(key)
            .and_then(|c| c.get(1))
            .is_some_and(|m| m.as_str() == metric)
            && self.rooms.matches_any(key, |b| selection.rooms.contains(b))
            && self.eras.matches_any(key, |b| selection.eras.contains(b))
            && self.furnishings.matches_any(key, |b| selection.furnishings.contains(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAJORE: &str = "loyer_reference_majore";

    fn all_keys() -> Vec<String> {
        let mut keys = Vec::new();
        for r in RoomCount::all() {
            for e in ConstructionEra::all() {
                for f in Furnishing::all() {
                    for m in ["loyer_reference", MAJORE, "loyer_reference_minore"] {
                        keys.push(format!("{}.{}.{}.{}", r.key(), e.key(), f.key(), m));
                    }
                }
            }
        }
        keys
    }

    #[test]
    fn split_decomposes_all_four_fields() {
        let key = CompoundKey::split("4 et plus.après 1990.non meuble.loyer_reference_majore").unwrap();
        assert_eq!(key.rooms(), RoomCount::FourOrMore);
        assert_eq!(key.era(), ConstructionEra::After1990);
        assert_eq!(key.furnishing(), Furnishing::Unfurnished);
        assert_eq!(key.metric(), MAJORE);
        assert_eq!(key.to_string(), "4 et plus.après 1990.non meuble.loyer_reference_majore");
    }

    #[test]
    fn overlapping_patterns_are_ambiguous() {
        let set = PatternSet {
            patterns: vec![
                (RoomCount::One, Regex::new(r"^1\.").unwrap()),
                (RoomCount::FourOrMore, Regex::new(r"^[0-9]").unwrap()),
            ],
        };
        let err = set.classify("1.après 1990.meuble.loyer_reference").unwrap_err();
        assert_eq!(err, KeyError::Ambiguous {
            key: "1.après 1990.meuble.loyer_reference".to_string(),
            dimension: crate::bucket::Dimension::Rooms,
            candidates: vec!["1", "4 et plus"],
        });
        assert_eq!(set.classify("4 et plus.après 1990.meuble.x").unwrap(), RoomCount::FourOrMore);
    }

    #[test]
    fn split_rejects_malformed_keys() {
        assert!(matches!(CompoundKey::split("1.avant 1946.meuble"), Err(KeyError::SegmentCount { found: 3, .. })));
        assert!(matches!(CompoundKey::split("1.avant 1946.meuble.x.y"), Err(KeyError::SegmentCount { found: 5, .. })));
        assert!(matches!(CompoundKey::split("1..meuble.x"), Err(KeyError::EmptySegment { .. })));
        assert!(matches!(
            CompoundKey::split("5.avant 1946.meuble.x"),
            Err(KeyError::UnknownBucket { dimension: crate::bucket::Dimension::Rooms, .. })
        ));
        assert!(matches!(
            CompoundKey::split("1.avant 1946.meublé.x"),
            Err(KeyError::UnknownBucket { dimension: crate::bucket::Dimension::Furnishing, .. })
        ));
    }

    #[test]
    fn classifier_agrees_with_split_on_every_key() {
        let classifier = KeyClassifier::new();
        for key in all_keys() {
            assert_eq!(classifier.classify(&key).unwrap(), CompoundKey::split(&key).unwrap(), "{key}");
        }
    }

    #[test]
    fn furnished_pattern_does_not_match_unfurnished() {
        let classifier = KeyClassifier::new();
        let key = classifier.classify("1.avant 1946.non meuble.loyer_reference").unwrap();
        assert_eq!(key.furnishing(), Furnishing::Unfurnished);
    }

    #[test]
    fn classifier_reports_unmatched_dimension() {
        let classifier = KeyClassifier::new();
        let err = classifier.classify("1.vers 2000.meuble.loyer_reference").unwrap_err();
        assert_eq!(err, KeyError::Unmatched {
            key: "1.vers 2000.meuble.loyer_reference".into(),
            dimension: crate::bucket::Dimension::Era,
        });
    }

    #[test]
    fn matches_follows_selection_and_metric() {
        let classifier = KeyClassifier::new();
        let selection = FilterSelection::new(
            [RoomCount::One, RoomCount::Two],
            [ConstructionEra::After1990],
            [Furnishing::Unfurnished],
        );
        assert!(classifier.matches("1.après 1990.non meuble.loyer_reference_majore", &selection, MAJORE));
        assert!(!classifier.matches("1.après 1990.non meuble.loyer_reference", &selection, MAJORE));
        assert!(!classifier.matches("3.après 1990.non meuble.loyer_reference_majore", &selection, MAJORE));
        assert!(!classifier.matches("1.après 1990.meuble.loyer_reference_majore", &selection, MAJORE));
        assert!(!classifier.matches("1.après 1990.non meuble.loyer_reference_majore", &FilterSelection::none(), MAJORE));
    }
}
