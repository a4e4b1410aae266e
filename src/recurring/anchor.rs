//! Date arithmetic for recurring expense generation.
//!
//! Generated expenses are dated on the first day of their period (the 1st of
//! the month or January 1). The functions here work out which of those
//! period starts fall inside a generation window.

use time::{Date, Month};

use crate::recurring::models::{Cadence, RecurringTemplate};

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The dates a call to generate expenses for `template` up to `as_of` should cover.
///
/// The window starts the day after the template's watermark, or on its start
/// date if nothing has been generated, and ends at `as_of` or the template's
/// end date, whichever is earlier.
///
/// Returns `None` when the window would start after `as_of`, i.e. there is
/// nothing new to generate. The returned window may still be empty (start
/// after end) when the template ended before the watermark.
pub fn generation_window(template: &RecurringTemplate, as_of: Date) -> Option<DateRange> {
    let start = match template.last_generated_date {
        Some(watermark) => watermark.next_day()?,
        None => template.start_date,
    };

    if start > as_of {
        return None;
    }

    let end = match template.end_date {
        Some(end_date) => end_date.min(as_of),
        None => as_of,
    };

    Some(DateRange { start, end })
}

/// The period start dates for `cadence` that fall inside `window`, oldest first.
pub fn anchor_dates(cadence: Cadence, window: DateRange) -> Vec<Date> {
    match cadence {
        Cadence::Monthly => monthly_anchors(window),
        Cadence::Yearly => yearly_anchors(window),
    }
}

fn monthly_anchors(window: DateRange) -> Vec<Date> {
    let mut anchors = Vec::new();
    let mut year = window.start.year();
    let mut month = window.start.month();

    // Stops at the window end, or at the last representable year.
    while let Ok(anchor) = Date::from_calendar_date(year, month, 1) {
        if anchor > window.end {
            break;
        }

        if anchor >= window.start {
            anchors.push(anchor);
        }

        if month == Month::December {
            year += 1;
        }
        month = month.next();
    }

    anchors
}

fn yearly_anchors(window: DateRange) -> Vec<Date> {
    (window.start.year()..=window.end.year())
        .filter_map(|year| Date::from_calendar_date(year, Month::January, 1).ok())
        .filter(|anchor| window.contains(*anchor))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use crate::recurring::models::{Cadence, RecurringTemplate};

    use super::{DateRange, anchor_dates, generation_window};

    fn template(start_date: Date, end_date: Option<Date>) -> RecurringTemplate {
        RecurringTemplate {
            id: 1,
            category_id: 1,
            amount: 10.0,
            description: None,
            cadence: Cadence::Monthly,
            start_date,
            end_date,
            last_generated_date: None,
            active: true,
        }
    }

    #[test]
    fn window_starts_at_start_date_when_never_generated() {
        let template = template(date!(2024 - 01 - 15), None);

        let window = generation_window(&template, date!(2024 - 04 - 30));

        assert_eq!(
            window,
            Some(DateRange {
                start: date!(2024 - 01 - 15),
                end: date!(2024 - 04 - 30)
            })
        );
    }

    #[test]
    fn window_starts_day_after_watermark() {
        let mut template = template(date!(2024 - 01 - 15), None);
        template.last_generated_date = Some(date!(2024 - 02 - 29));

        let window = generation_window(&template, date!(2024 - 04 - 30));

        assert_eq!(window.map(|window| window.start), Some(date!(2024 - 03 - 01)));
    }

    #[test]
    fn window_is_clipped_to_end_date() {
        let template = template(date!(2022 - 06 - 01), Some(date!(2024 - 12 - 31)));

        let window = generation_window(&template, date!(2030 - 01 - 01));

        assert_eq!(window.map(|window| window.end), Some(date!(2024 - 12 - 31)));
    }

    #[test]
    fn no_window_when_start_is_after_as_of() {
        let template = template(date!(2024 - 05 - 01), None);

        assert_eq!(generation_window(&template, date!(2024 - 04 - 30)), None);
    }

    #[test]
    fn no_window_when_watermark_is_as_of() {
        let mut template = template(date!(2024 - 01 - 01), None);
        template.last_generated_date = Some(date!(2024 - 04 - 30));

        assert_eq!(generation_window(&template, date!(2024 - 04 - 30)), None);
    }

    #[test]
    fn no_window_when_watermark_is_max_date() {
        let mut template = template(date!(2024 - 01 - 01), None);
        template.last_generated_date = Some(Date::MAX);

        assert_eq!(generation_window(&template, Date::MAX), None);
    }

    #[test]
    fn monthly_anchors_skip_first_of_month_before_window() {
        let window = DateRange {
            start: date!(2024 - 01 - 15),
            end: date!(2024 - 04 - 30),
        };

        assert_eq!(
            anchor_dates(Cadence::Monthly, window),
            vec![date!(2024 - 02 - 01), date!(2024 - 03 - 01), date!(2024 - 04 - 01)]
        );
    }

    #[test]
    fn monthly_anchors_include_both_bounds() {
        let window = DateRange {
            start: date!(2024 - 11 - 01),
            end: date!(2025 - 02 - 01),
        };

        assert_eq!(
            anchor_dates(Cadence::Monthly, window),
            vec![
                date!(2024 - 11 - 01),
                date!(2024 - 12 - 01),
                date!(2025 - 01 - 01),
                date!(2025 - 02 - 01)
            ]
        );
    }

    #[test]
    fn monthly_anchors_empty_within_single_month() {
        let window = DateRange {
            start: date!(2024 - 03 - 02),
            end: date!(2024 - 03 - 31),
        };

        assert!(anchor_dates(Cadence::Monthly, window).is_empty());
    }

    #[test]
    fn anchors_empty_for_inverted_window() {
        let window = DateRange {
            start: date!(2025 - 01 - 01),
            end: date!(2024 - 12 - 31),
        };

        assert!(anchor_dates(Cadence::Monthly, window).is_empty());
        assert!(anchor_dates(Cadence::Yearly, window).is_empty());
    }

    #[test]
    fn yearly_anchors_are_january_first_inside_window() {
        let window = DateRange {
            start: date!(2022 - 06 - 01),
            end: date!(2024 - 12 - 31),
        };

        assert_eq!(
            anchor_dates(Cadence::Yearly, window),
            vec![date!(2023 - 01 - 01), date!(2024 - 01 - 01)]
        );
    }

    #[test]
    fn yearly_anchor_on_window_start() {
        let window = DateRange {
            start: date!(2024 - 01 - 01),
            end: date!(2024 - 01 - 01),
        };

        assert_eq!(
            anchor_dates(Cadence::Yearly, window),
            vec![date!(2024 - 01 - 01)]
        );
    }
}
