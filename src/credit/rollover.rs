//! The due-date rollover rule: how far a credit's next payment date advances
//! after a settlement.

use time::{Date, Duration, Month};

use crate::credit::core::PaymentFrequency;

/// Compute the due date that follows `date` for a credit paid at `frequency`.
///
/// Weekly and biweekly advance by exactly 7 and 14 days. Monthly and yearly
/// advance by one calendar month and one calendar year, preserving the
/// day-of-month where the target month has it and clamping to the last day
/// otherwise (Jan 31 → Feb 28/29). There is no business-day adjustment.
pub fn next_due_date(date: Date, frequency: PaymentFrequency) -> Date {
    match frequency {
        PaymentFrequency::Weekly => date + Duration::days(7),
        PaymentFrequency::Biweekly => date + Duration::days(14),
        PaymentFrequency::Monthly => add_calendar_months(date, 1),
        PaymentFrequency::Yearly => add_calendar_months(date, 12),
    }
}

fn add_calendar_months(date: Date, months: i32) -> Date {
    let zero_based_month = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = zero_based_month.div_euclid(12);
    let month = Month::try_from((zero_based_month.rem_euclid(12) + 1) as u8)
        .expect("modular arithmetic keeps months in 1-12");
    let day = date.day().min(month.length(year));

    Date::from_calendar_date(year, month, day).expect("day is clamped to the month's length")
}
