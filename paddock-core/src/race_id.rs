//! Race identifier decoding.
//!
//! A race identifier is a fixed 12-digit token `YYYYPPNNDDRR`:
//!
//! | chars | field | range |
//! |-------|-------|-------|
//! | 0..4  | year  | 1900..=2100 |
//! | 4..6  | venue | `01`..=`10` (JRA courses) |
//! | 6..8  | meeting round | 1..=99 |
//! | 8..10 | day of meeting | 1..=99 |
//! | 10..12| race number | 1..=12 |

use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Width of an encoded race identifier.
pub const RACE_ID_WIDTH: usize = 12;

/// Width of the meeting-day prefix (`YYYYPPNNDD`).
pub const MEETING_PREFIX_WIDTH: usize = 10;

pub const YEAR_RANGE: RangeInclusive<u16> = 1900..=2100;
pub const MAX_RACES_PER_DAY: u8 = 12;

/// JRA racecourse, keyed by its two-digit venue code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Sapporo,
    Hakodate,
    Fukushima,
    Niigata,
    Tokyo,
    Nakayama,
    Chukyo,
    Kyoto,
    Hanshin,
    Kokura,
}

impl Venue {
    pub const ALL: [Venue; 10] = [
        Venue::Sapporo,
        Venue::Hakodate,
        Venue::Fukushima,
        Venue::Niigata,
        Venue::Tokyo,
        Venue::Nakayama,
        Venue::Chukyo,
        Venue::Kyoto,
        Venue::Hanshin,
        Venue::Kokura,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Venue::Sapporo => "01",
            Venue::Hakodate => "02",
            Venue::Fukushima => "03",
            Venue::Niigata => "04",
            Venue::Tokyo => "05",
            Venue::Nakayama => "06",
            Venue::Chukyo => "07",
            Venue::Kyoto => "08",
            Venue::Hanshin => "09",
            Venue::Kokura => "10",
        }
    }

    /// Course name as it appears in scraped result pages.
    pub fn local_name(self) -> &'static str {
        match self {
            Venue::Sapporo => "札幌",
            Venue::Hakodate => "函館",
            Venue::Fukushima => "福島",
            Venue::Niigata => "新潟",
            Venue::Tokyo => "東京",
            Venue::Nakayama => "中山",
            Venue::Chukyo => "中京",
            Venue::Kyoto => "京都",
            Venue::Hanshin => "阪神",
            Venue::Kokura => "小倉",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Decoded race identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RaceKey {
    pub year: u16,
    pub venue: Venue,
    pub round: u8,
    pub day: u8,
    pub race: u8,
}

impl RaceKey {
    /// Build a key, enforcing the same ranges as decoding.
    pub fn new(year: u16, venue: Venue, round: u8, day: u8, race: u8) -> Result<Self, VerifyError> {
        let key = Self {
            year,
            venue,
            round,
            day,
            race,
        };
        key.check_ranges().map_err(|reason| VerifyError::malformed(key.encode(), reason))?;
        Ok(key)
    }

    fn check_ranges(&self) -> Result<(), String> {
        if !YEAR_RANGE.contains(&self.year) {
            return Err(format!(
                "year {} outside {}..={}",
                self.year,
                YEAR_RANGE.start(),
                YEAR_RANGE.end()
            ));
        }
        if !(1..=99).contains(&self.round) {
            return Err(format!("meeting round {} must be 1..=99", self.round));
        }
        if !(1..=99).contains(&self.day) {
            return Err(format!("meeting day {} must be 1..=99", self.day));
        }
        if !(1..=MAX_RACES_PER_DAY).contains(&self.race) {
            return Err(format!(
                "race number {} must be 1..={MAX_RACES_PER_DAY}",
                self.race
            ));
        }
        Ok(())
    }

    /// Encode back to the 12-digit token; exact inverse of decoding.
    pub fn encode(&self) -> String {
        format!(
            "{:04}{}{:02}{:02}{:02}",
            self.year,
            self.venue.code(),
            self.round,
            self.day,
            self.race
        )
    }

    /// `YYYYPPNNDD`: shared by every race run at one venue on one meeting day.
    pub fn meeting_prefix(&self) -> String {
        let mut encoded = self.encode();
        encoded.truncate(MEETING_PREFIX_WIDTH);
        encoded
    }

    pub fn venue_code(&self) -> &'static str {
        self.venue.code()
    }

    pub fn round_code(&self) -> String {
        format!("{:02}", self.round)
    }

    pub fn day_code(&self) -> String {
        format!("{:02}", self.day)
    }

    pub fn race_code(&self) -> String {
        format!("{:02}", self.race)
    }
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for RaceKey {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_race_identifier(s)
    }
}

/// Decode a race identifier into its fields.
///
/// Pure: validates width and character class of the raw token before
/// slicing, then checks every field against its documented range. No
/// whitespace trimming or float suffix stripping is done here.
pub fn decode_race_identifier(identifier: &str) -> Result<RaceKey, VerifyError> {
    let token = identifier;

    if token.len() != RACE_ID_WIDTH {
        return Err(VerifyError::malformed(
            identifier,
            format!("expected {RACE_ID_WIDTH} characters, got {}", token.chars().count()),
        ));
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VerifyError::malformed(identifier, "non-numeric segment"));
    }

    let field = |range: std::ops::Range<usize>| -> Result<u16, VerifyError> {
        token[range]
            .parse::<u16>()
            .map_err(|e| VerifyError::malformed(identifier, e.to_string()))
    };

    let year = field(0..4)?;
    let venue_code = &token[4..6];
    let venue = Venue::from_code(venue_code).ok_or_else(|| {
        VerifyError::malformed(identifier, format!("unknown venue code {venue_code}"))
    })?;
    // two-digit fields always fit in u8
    let round = field(6..8)? as u8;
    let day = field(8..10)? as u8;
    let race = field(10..12)? as u8;

    let key = RaceKey {
        year,
        venue,
        round,
        day,
        race,
    };
    key.check_ranges()
        .map_err(|reason| VerifyError::malformed(identifier, reason))?;
    Ok(key)
}

/// Inverse of [`decode_race_identifier`].
pub fn encode_race_identifier(key: &RaceKey) -> String {
    key.encode()
}
