//! Fixed category vocabularies for the three filter dimensions.
//!
//! Each bucket has a source `key` (the segment used inside compound keys of
//! the dataset) and a display `label` (the French text shown to users).

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};

/// The three categorical dimensions of a compound key, in key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Rooms,
    Era,
    Furnishing,
}

impl Dimension {
    pub fn to_str(&self) -> &'static str {
        match self {
            Dimension::Rooms => "room count",
            Dimension::Era => "construction era",
            Dimension::Furnishing => "furnishing",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

/// Shared behaviour of the bucket enums.
pub trait Bucket: Copy + Ord + fmt::Debug + 'static {
    const DIMENSION: Dimension;

    /// Every value of the vocabulary, in display order.
    fn all() -> &'static [Self];

    /// Segment used in the dataset's compound keys.
    fn key(&self) -> &'static str;

    /// Human-readable label.
    fn label(&self) -> &'static str;

    /// Exact lookup by source key.
    fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|b| b.key() == key)
    }

    /// Lenient lookup used for user input: source key or label, case-insensitive.
    fn parse_user(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::all().iter().copied().find(|b| {
            b.key().eq_ignore_ascii_case(input) || b.label().to_lowercase() == input.to_lowercase()
        })
    }
}

/// Number of main rooms of the dwelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomCount {
    One,
    Two,
    Three,
    FourOrMore,
}

impl Bucket for RoomCount {
    const DIMENSION: Dimension = Dimension::Rooms;

    fn all() -> &'static [Self] {
        &[RoomCount::One, RoomCount::Two, RoomCount::Three, RoomCount::FourOrMore]
    }

    fn key(&self) -> &'static str {
        match self {
            RoomCount::One => "1",
            RoomCount::Two => "2",
            RoomCount::Three => "3",
            RoomCount::FourOrMore => "4 et plus",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RoomCount::One => "1 pièce",
            RoomCount::Two => "2 pièces",
            RoomCount::Three => "3 pièces",
            RoomCount::FourOrMore => "4 pièces et plus",
        }
    }
}

/// Construction period of the building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstructionEra {
    Before1946,
    From1946To1970,
    From1971To1990,
    After1990,
}

impl Bucket for ConstructionEra {
    const DIMENSION: Dimension = Dimension::Era;

    fn all() -> &'static [Self] {
        &[
            ConstructionEra::Before1946,
            ConstructionEra::From1946To1970,
            ConstructionEra::From1971To1990,
            ConstructionEra::After1990,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            ConstructionEra::Before1946 => "avant 1946",
            ConstructionEra::From1946To1970 => "1946-70",
            ConstructionEra::From1971To1990 => "1971-90",
            ConstructionEra::After1990 => "après 1990",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ConstructionEra::Before1946 => "Avant 1946",
            ConstructionEra::From1946To1970 => "Entre 1946 et 1970",
            ConstructionEra::From1971To1990 => "Entre 1971 et 1990",
            ConstructionEra::After1990 => "Après 1990",
        }
    }
}

/// Furnished or unfurnished letting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Furnishing {
    Furnished,
    Unfurnished,
}

impl Bucket for Furnishing {
    const DIMENSION: Dimension = Dimension::Furnishing;

    fn all() -> &'static [Self] { &[Furnishing::Furnished, Furnishing::Unfurnished] }

    fn key(&self) -> &'static str {
        match self {
            Furnishing::Furnished => "meuble",
            Furnishing::Unfurnished => "non meuble",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Furnishing::Furnished => "Meublé",
            Furnishing::Unfurnished => "Non meublé",
        }
    }
}

macro_rules! impl_display_from_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                <$ty as Bucket>::parse_user(s).ok_or_else(|| anyhow!(
                    "unknown {} {:?}, expected one of: {}",
                    <$ty as Bucket>::DIMENSION,
                    s,
                    <$ty as Bucket>::all().iter().map(|b| b.key()).collect::<Vec<_>>().join(", "),
                ))
            }
        }
    )*};
}

impl_display_from_str!(RoomCount, ConstructionEra, Furnishing);

/// The (room, era, furnishing) part of a compound key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketTuple {
    pub rooms: RoomCount,
    pub era: ConstructionEra,
    pub furnishing: Furnishing,
}

impl BucketTuple {
    pub fn new(rooms: RoomCount, era: ConstructionEra, furnishing: Furnishing) -> Self {
        Self { rooms, era, furnishing }
    }
}

impl fmt::Display for BucketTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.rooms, self.era, self.furnishing)
    }
}
