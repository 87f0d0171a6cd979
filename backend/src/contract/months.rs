use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use super::format;

/// Calendar months, named as they appear in contract templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// `1` is January.
    pub fn from_number(number: u32) -> Option<Month> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        Month::ALL.get(index).copied()
    }

    /// Template key and display name.
    pub fn name(self) -> &'static str {
        match self {
            Month::January => "январ",
            Month::February => "феврал",
            Month::March => "март",
            Month::April => "апрел",
            Month::May => "май",
            Month::June => "июн",
            Month::July => "июл",
            Month::August => "август",
            Month::September => "сентябр",
            Month::October => "октябр",
            Month::November => "ноябр",
            Month::December => "декабр",
        }
    }
}

/// Fee scheduled for each month, addressable in templates as `{март}` etc.
///
/// Serializes every month, so a template may name any of them; months
/// without a scheduled fee render as the placeholder text.
#[derive(Debug, Clone, Default)]
pub struct MonthFees {
    fees: BTreeMap<Month, String>,
}

impl MonthFees {
    /// Later entries for the same month replace earlier ones.
    pub fn set(&mut self, month: Month, fee: String) {
        self.fees.insert(month, fee);
    }

    pub fn get(&self, month: Month) -> &str {
        self.fees
            .get(&month)
            .map(String::as_str)
            .unwrap_or(format::NOT_AVAILABLE)
    }
}

impl Serialize for MonthFees {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Month::ALL.len()))?;
        for month in Month::ALL {
            map.serialize_entry(month.name(), self.get(month))?;
        }
        map.end()
    }
}
