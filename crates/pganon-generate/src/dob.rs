use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::generator::{random_int, Generator};

/// Date format styles detected from input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateStyle {
    Iso,
    UsSlash,
    UsSlashShort,
    Long,
}

fn detect_date_style(input: &str) -> DateStyle {
    let bytes = input.as_bytes();
    if input.len() >= 10 && bytes[4] == b'-' && bytes[7] == b'-' {
        return DateStyle::Iso;
    }

    if input.contains('/') {
        let parts: Vec<&str> = input.split('/').collect();
        if parts.len() == 3 {
            if parts[2].len() == 4 {
                return DateStyle::UsSlash;
            }
            return DateStyle::UsSlashShort;
        }
    }

    const MONTHS: &[&str] = &[
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December", "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug",
        "Sep", "Oct", "Nov", "Dec",
    ];
    if MONTHS.iter().any(|m| input.contains(m)) {
        return DateStyle::Long;
    }

    DateStyle::Iso
}

fn format_date(date: NaiveDate, style: DateStyle) -> String {
    match style {
        DateStyle::Iso => date.format("%Y-%m-%d").to_string(),
        DateStyle::UsSlash => date.format("%m/%d/%Y").to_string(),
        DateStyle::UsSlashShort => date.format("%m/%d/%y").to_string(),
        DateStyle::Long => format!("{} {}, {}", date.format("%B"), date.day(), date.year()),
    }
}

/// Dates of birth within an age window, formatted like the input.
pub struct DobGenerator {
    name: &'static str,
    min_age: i32,
    max_age: i32,
}

impl DobGenerator {
    pub fn any() -> Self {
        Self { name: "DOB", min_age: 0, max_age: 100 }
    }

    pub fn over_13() -> Self {
        Self { name: "DOB_OVER_13", min_age: 13, max_age: 100 }
    }

    pub fn over_16() -> Self {
        Self { name: "DOB_OVER_16", min_age: 16, max_age: 100 }
    }

    pub fn over_18() -> Self {
        Self { name: "DOB_OVER_18", min_age: 18, max_age: 100 }
    }

    pub fn over_21() -> Self {
        Self { name: "DOB_OVER_21", min_age: 21, max_age: 100 }
    }
}

impl Generator for DobGenerator {
    fn name(&self) -> &str {
        self.name
    }

    fn generate(&self, input: &str) -> String {
        let today = Local::now().date_naive();
        let youngest = shift_years(today, -self.min_age);
        let oldest = shift_years(today, -self.max_age);

        let span = (youngest - oldest).num_days().max(1);
        let dob = oldest + Duration::days(random_int(span as usize) as i64);

        format_date(dob, detect_date_style(input))
    }
}

fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    date.with_year(date.year() + years)
        // Feb 29 on a non-leap target year.
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(date.year() + years, 2, 28).unwrap_or(date))
}
