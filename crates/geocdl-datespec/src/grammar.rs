//! Grammar-level parsing: the `dates` string and the Y/M/D number-values
//! strings, translated directly from the reference implementation's
//! `_parseSimpleDates`/`_parseSimpleDateRange`/`_parseYMD`/`_parseRangeStr`/
//! `_parseNumValsStr` private methods into independently testable free
//! functions.

use chrono::{Datelike, NaiveDate};
use geocdl_common::{GeoCdlError, GeoCdlResult, Grain, RequestDate};
use std::collections::BTreeSet;

/// Parses a range string of the form `"STARTVAL:ENDVAL[+INCREMENT]"`.
///
/// Returns the range as an ordered list of integers (smallest to largest),
/// inclusive of the endpoints unless `ENDVAL` doesn't land on the increment.
/// `ENDVAL == "N"` is interpreted as `maxval`.
pub fn parse_range_str(rangestr: &str, maxval: Option<i64>) -> GeoCdlResult<Vec<i64>> {
    let parts: Vec<&str> = rangestr.split(':').collect();
    if parts.len() != 2 {
        return Err(GeoCdlError::BadDateSpec(format!("Invalid range string: \"{}\".", rangestr)));
    }

    let startval: i64 = parts[0]
        .parse()
        .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid range string: \"{}\".", rangestr)))?;

    let (endval_str, inc) = if let Some(idx) = parts[1].find('+') {
        let (end_part, inc_part) = (&parts[1][..idx], &parts[1][idx + 1..]);
        let inc: i64 = inc_part
            .parse()
            .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid range string: \"{}\".", rangestr)))?;
        (end_part, inc)
    } else {
        (parts[1], 1)
    };

    let endval = if endval_str == "N" {
        maxval.ok_or(GeoCdlError::NoMaxForN)?
    } else {
        endval_str
            .parse()
            .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid range string: \"{}\".", rangestr)))?
    };

    if startval > endval {
        return Err(GeoCdlError::BadDateSpec(format!(
            "Invalid range string: \"{}\". The starting value cannot exceed the ending value.",
            rangestr
        )));
    }
    if startval <= 0 || endval <= 0 {
        return Err(GeoCdlError::BadDateSpec(format!(
            "Invalid range string: \"{}\". The starting and ending values must be greater than 0.",
            rangestr
        )));
    }
    if let Some(maxval) = maxval {
        if endval > maxval {
            return Err(GeoCdlError::BadDateSpec(format!(
                "Invalid range string: \"{}\". The ending value cannot exceed {}.",
                rangestr, maxval
            )));
        }
    }

    let mut out = Vec::new();
    let mut v = startval;
    while v <= endval {
        out.push(v);
        v += inc;
    }
    Ok(out)
}

/// Parses a number-values string (`NUMVALSSTR = (SINGLEVAL | RANGESTR) ,
/// [{",", (SINGLEVAL | RANGESTR)}]`) into a sorted, deduplicated list of
/// integers.
pub fn parse_num_vals_str(nvstr: &str, maxval: Option<i64>) -> GeoCdlResult<Vec<i64>> {
    let mut nvals: BTreeSet<i64> = BTreeSet::new();

    for part in nvstr.split(',') {
        if part.contains(':') {
            for v in parse_range_str(part, maxval)? {
                nvals.insert(v);
            }
        } else {
            let newval = if part == "N" {
                maxval.ok_or(GeoCdlError::NoMaxForN)?
            } else {
                part.parse().map_err(|_| {
                    GeoCdlError::BadDateSpec(format!("Invalid date values string: \"{}\".", nvstr))
                })?
            };

            if let Some(maxval) = maxval {
                if newval > maxval {
                    return Err(GeoCdlError::BadDateSpec(format!(
                        "Invalid date values string: \"{}\". The values cannot exceed {}.",
                        nvstr, maxval
                    )));
                }
            }
            if newval <= 0 {
                return Err(GeoCdlError::BadDateSpec(format!(
                    "Invalid date values string: \"{}\". The values must be greater than 0.",
                    nvstr
                )));
            }

            nvals.insert(newval);
        }
    }

    Ok(nvals.into_iter().collect())
}

pub(crate) fn days_in_month(year: i32, month: u32) -> i64 {
    let this_month = NaiveDate::from_ymd_opt(year, month, 1).expect("validated month");
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    (next_month - this_month).num_days()
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Generates a list of [`RequestDate`]s from the Y/M/D number-values
/// strings, mirroring `_parseYMD`.
pub fn parse_ymd(
    years_str: Option<&str>,
    months_str: Option<&str>,
    days_str: Option<&str>,
) -> GeoCdlResult<(Vec<RequestDate>, Grain)> {
    let years_str = years_str.filter(|s| !s.is_empty()).ok_or(GeoCdlError::MissingYears)?;

    let years = parse_num_vals_str(years_str, None)?;

    let months = match months_str.filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_num_vals_str(s, Some(12))?),
        None => None,
    };

    let days_str = days_str.filter(|s| !s.is_empty());

    let mut dates = Vec::new();

    let grain = match (days_str, &months) {
        (None, None) => {
            for year in &years {
                dates.push(RequestDate::annual(*year as i32));
            }
            Grain::Annual
        }
        (None, Some(months)) => {
            for year in &years {
                for month in months {
                    dates.push(RequestDate::monthly(*year as i32, *month as u8));
                }
            }
            Grain::Monthly
        }
        (Some(days_str), None) => {
            // Pre-parse day values for leap and common years so the day
            // values string isn't repeatedly reparsed.
            let days_common = parse_num_vals_str(days_str, Some(365))?;
            let days_leap = parse_num_vals_str(days_str, Some(366))?;

            for year in &years {
                let year = *year as i32;
                let days = if is_leap(year) { &days_leap } else { &days_common };
                let ord_jan1 = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();

                for day in days {
                    let d = ord_jan1 + chrono::Duration::days(day - 1);
                    dates.push(RequestDate::daily(d.year(), d.month() as u8, d.day() as u8));
                }
            }
            Grain::Daily
        }
        (Some(days_str), Some(months)) => {
            for year in &years {
                let year = *year as i32;
                for month in months {
                    let month = *month as u32;
                    let days = parse_num_vals_str(days_str, Some(days_in_month(year, month)))?;
                    for day in days {
                        dates.push(RequestDate::daily(year, month as u8, day as u8));
                    }
                }
            }
            Grain::Daily
        }
    };

    Ok((dates, grain))
}

/// Parses a starting/ending simple date pair (`"YYYY"`, `"YYYY-M"`, or
/// `"YYYY-M-D"`) and returns the inclusive date list plus its inferred
/// grain, mirroring `_parseSimpleDateRange`.
pub fn parse_simple_date_range(date_start: &str, date_end: &str) -> GeoCdlResult<(Vec<RequestDate>, Grain)> {
    if date_start.is_empty() || date_end.is_empty() {
        return Err(GeoCdlError::BadDateSpec("Start and end dates must both be specified.".into()));
    }

    let start_segs: Vec<&str> = date_start.split('-').collect();
    let end_segs: Vec<&str> = date_end.split('-').collect();

    if start_segs.len() != end_segs.len() {
        return Err(GeoCdlError::BadDateSpec(
            "Mismatched starting and ending date range granularity.".into(),
        ));
    }

    let mut dates = Vec::new();

    match start_segs.len() {
        1 => {
            let start: i32 = start_segs[0]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid year: \"{}\".", date_start)))?;
            let end: i32 = end_segs[0]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid year: \"{}\".", date_end)))?;
            if end < start {
                return Err(GeoCdlError::EndBeforeStart);
            }
            for year in start..=end {
                dates.push(RequestDate::annual(year));
            }
            Ok((dates, Grain::Annual))
        }
        2 => {
            let start_y: i32 = start_segs[0]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", date_start)))?;
            let start_m: u32 = start_segs[1]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", date_start)))?;
            let end_y: i32 = end_segs[0]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", date_end)))?;
            let end_m: u32 = end_segs[1]
                .parse()
                .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", date_end)))?;

            if !(1..=12).contains(&start_m) {
                return Err(GeoCdlError::InvalidMonth(start_m));
            }
            if !(1..=12).contains(&end_m) {
                return Err(GeoCdlError::InvalidMonth(end_m));
            }
            if (end_y as i64) * 12 + end_m as i64 < (start_y as i64) * 12 + start_m as i64 {
                return Err(GeoCdlError::EndBeforeStart);
            }

            let mut cur_y = start_y;
            let mut cur_m = start_m;
            loop {
                dates.push(RequestDate::monthly(cur_y, cur_m as u8));
                if cur_y == end_y && cur_m == end_m {
                    break;
                }
                if cur_m == 12 {
                    cur_m = 1;
                    cur_y += 1;
                } else {
                    cur_m += 1;
                }
            }
            Ok((dates, Grain::Monthly))
        }
        3 => {
            let parse_ymd_triplet = |segs: &[&str], which: &str| -> GeoCdlResult<NaiveDate> {
                let y: i32 = segs[0]
                    .parse()
                    .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", which)))?;
                let m: u32 = segs[1]
                    .parse()
                    .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", which)))?;
                let d: u32 = segs[2]
                    .parse()
                    .map_err(|_| GeoCdlError::BadDateSpec(format!("Invalid date: \"{}\".", which)))?;
                if !(1..=12).contains(&m) {
                    return Err(GeoCdlError::InvalidMonth(m));
                }
                NaiveDate::from_ymd_opt(y, m, d).ok_or(GeoCdlError::InvalidDay(d))
            };

            let inc_start = parse_ymd_triplet(&start_segs, date_start)?;
            let end_date = parse_ymd_triplet(&end_segs, date_end)?;

            if end_date < inc_start {
                return Err(GeoCdlError::EndBeforeStart);
            }

            let mut inc_date = inc_start;
            while inc_date <= end_date {
                dates.push(RequestDate::daily(inc_date.year(), inc_date.month() as u8, inc_date.day() as u8));
                inc_date += chrono::Duration::days(1);
            }
            Ok((dates, Grain::Daily))
        }
        _ => Err(GeoCdlError::BadDateSpec(
            "Mismatched starting and ending date range granularity.".into(),
        )),
    }
}

/// Parses a full `dates` string (comma-separated list of single dates and/or
/// ranges) into a sorted, deduplicated [`RequestDate`] list and its shared
/// grain, mirroring `_parseSimpleDates`. All entries must share the same
/// grain; mixed grains are rejected with [`GeoCdlError::MixedGrain`].
pub fn parse_dates_string(datesstr: &str) -> GeoCdlResult<(Vec<RequestDate>, Grain)> {
    let mut dvals: BTreeSet<RequestDate> = BTreeSet::new();
    let mut date_grain: Option<Grain> = None;

    for part in datesstr.split(',') {
        let (dr_start, dr_end) = match part.split_once(':') {
            Some((s, e)) => (s, e),
            None => (part, part),
        };

        let (new_dates, new_grain) = parse_simple_date_range(dr_start, dr_end)?;

        match date_grain {
            None => date_grain = Some(new_grain),
            Some(g) if g != new_grain => return Err(GeoCdlError::MixedGrain),
            _ => {}
        }

        dvals.extend(new_dates);
    }

    let grain = date_grain.ok_or_else(|| GeoCdlError::BadDateSpec("Empty dates string.".into()))?;
    Ok((dvals.into_iter().collect(), grain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_str_basic() {
        assert_eq!(parse_range_str("1:5", None).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_range_str("1:10+2", None).unwrap(), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn range_str_n_requires_max() {
        assert!(matches!(parse_range_str("1:N", None), Err(GeoCdlError::NoMaxForN)));
        assert_eq!(parse_range_str("1:N", Some(5)).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn range_str_end_before_start_errors() {
        assert!(parse_range_str("5:1", None).is_err());
    }

    #[test]
    fn num_vals_str_dedups_and_sorts() {
        assert_eq!(parse_num_vals_str("3,1,2,1", None).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_num_vals_str("1:3,5", None).unwrap(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn ymd_years_only_is_annual() {
        let (dates, grain) = parse_ymd(Some("2000:2002"), None, None).unwrap();
        assert_eq!(grain, Grain::Annual);
        assert_eq!(dates, vec![RequestDate::annual(2000), RequestDate::annual(2001), RequestDate::annual(2002)]);
    }

    #[test]
    fn ymd_missing_years_errors() {
        assert!(matches!(parse_ymd(None, Some("1:3"), None), Err(GeoCdlError::MissingYears)));
    }

    #[test]
    fn ymd_years_and_days_uses_ordinal_conversion() {
        let (dates, grain) = parse_ymd(Some("2021"), None, Some("32")).unwrap();
        assert_eq!(grain, Grain::Daily);
        assert_eq!(dates, vec![RequestDate::daily(2021, 2, 1)]);
    }

    #[test]
    fn ymd_leap_year_day_366() {
        let (dates, _) = parse_ymd(Some("2020"), None, Some("366")).unwrap();
        assert_eq!(dates, vec![RequestDate::daily(2020, 12, 31)]);
        assert!(parse_ymd(Some("2021"), None, Some("366")).is_err());
    }

    #[test]
    fn simple_dates_annual_range() {
        let (dates, grain) = parse_dates_string("2000:2002").unwrap();
        assert_eq!(grain, Grain::Annual);
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[0], RequestDate::annual(2000));
        assert_eq!(dates[2], RequestDate::annual(2002));
    }

    #[test]
    fn simple_dates_monthly_range_inclusive_count() {
        let (dates, grain) = parse_dates_string("2015-01:2015-03").unwrap();
        assert_eq!(grain, Grain::Monthly);
        // months_between(start,end) + 1
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[0], RequestDate::monthly(2015, 1));
        assert_eq!(dates[2], RequestDate::monthly(2015, 3));
    }

    #[test]
    fn simple_dates_mixed_grain_errors() {
        assert!(matches!(parse_dates_string("2020,2020-01"), Err(GeoCdlError::MixedGrain)));
    }

    #[test]
    fn simple_dates_sorted_and_deduped() {
        let (dates, _) = parse_dates_string("2002,2000,2001,2000").unwrap();
        assert_eq!(dates, vec![RequestDate::annual(2000), RequestDate::annual(2001), RequestDate::annual(2002)]);
        // strictly ascending
        for w in dates.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn simple_dates_daily_leap_boundary() {
        let (dates, grain) = parse_dates_string("2020-02-28:2020-03-01").unwrap();
        assert_eq!(grain, Grain::Daily);
        assert_eq!(dates, vec![RequestDate::daily(2020, 2, 28), RequestDate::daily(2020, 2, 29), RequestDate::daily(2020, 3, 1)]);
    }

    #[test]
    fn simple_date_range_end_before_start_errors() {
        assert!(matches!(parse_simple_date_range("2005", "2000"), Err(GeoCdlError::EndBeforeStart)));
    }

    #[test]
    fn simple_date_range_invalid_month_errors() {
        assert!(matches!(parse_simple_date_range("2020-13", "2020-13"), Err(GeoCdlError::InvalidMonth(13))));
    }
}
