use chrono::{Datelike, NaiveDate, Weekday};

/// Counts chargeable leave days, skipping the organization's weekend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCalendar {
    weekend: Vec<Weekday>,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::new([Weekday::Sat, Weekday::Sun])
    }
}

impl BusinessCalendar {
    pub fn new(weekend: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days = Vec::new();
        for day in weekend {
            if !days.contains(&day) {
                days.push(day);
            }
        }
        Self { weekend: days }
    }

    pub fn weekend(&self) -> &[Weekday] {
        &self.weekend
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !self.weekend.contains(&date.weekday())
    }

    /// Inclusive count of business days in `[start, end]`; zero for an inverted range.
    pub fn business_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_business_day(*d))
            .count() as u32
    }
}
