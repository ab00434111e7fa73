//! Re-expresses an already-parsed [`RequestDate`] list at a different grain.
//!
//! `GrainNegotiator`'s `coarser`/`finer`/`any` policies hand a dataset a
//! grain other than the one the user's date spec was written at. Going
//! coarser is lossless truncation-then-dedup (`2015-03, 2015-07` at
//! `Annual` collapses to `2015`). Going finer has no extra information to
//! work with, so it fans each date out to every value the missing field
//! could take — every month of a requested year, every day of a requested
//! month — mirroring `_modifySimpleDateGrain`'s intent in the reference
//! implementation rather than its exact code path (see Open Questions).

use chrono::Datelike;
use geocdl_common::{GeoCdlError, GeoCdlResult, Grain, RequestDate};
use std::collections::BTreeSet;

use crate::grammar::days_in_month;

/// Regenerates `dates` at grain `to`. `dates` must all share one grain
/// (the caller's inferred grain); the result is sorted and deduplicated.
pub fn regrain(dates: &[RequestDate], to: Grain) -> GeoCdlResult<Vec<RequestDate>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }
    let from = dates[0].grain();
    if from == to {
        return Ok(dates.to_vec());
    }

    let mut out: BTreeSet<RequestDate> = BTreeSet::new();
    match (from, to) {
        // Coarser: drop fields, dedup.
        (_, Grain::Annual) => {
            for d in dates {
                out.insert(RequestDate::annual(d.year));
            }
        }
        (Grain::Daily, Grain::Monthly) => {
            for d in dates {
                out.insert(RequestDate::monthly(d.year, d.month.expect("daily has month")));
            }
        }
        // Finer: fan out to every value of the missing field(s).
        (Grain::Annual, Grain::Monthly) => {
            for d in dates {
                for m in 1..=12u8 {
                    out.insert(RequestDate::monthly(d.year, m));
                }
            }
        }
        (Grain::Annual, Grain::Daily) => {
            for d in dates {
                for m in 1..=12u8 {
                    for day in 1..=days_in_month(d.year, m as u32) {
                        out.insert(RequestDate::daily(d.year, m, day as u8));
                    }
                }
            }
        }
        (Grain::Monthly, Grain::Daily) => {
            for d in dates {
                let m = d.month.expect("monthly has month");
                for day in 1..=days_in_month(d.year, m as u32) {
                    out.insert(RequestDate::daily(d.year, m, day as u8));
                }
            }
        }
        (Grain::None, _) | (_, Grain::None) => {
            return Err(GeoCdlError::Internal("cannot regrain to/from Grain::None".into()));
        }
        (Grain::Monthly, Grain::Annual) | (Grain::Daily, Grain::Annual) => unreachable!("handled above"),
    }

    Ok(out.into_iter().collect())
}

/// Returns the day-of-year the given `(year, month, day)` date falls on,
/// used by callers that need to cross-check a finer-grain fan-out against
/// an original day-of-year value string.
pub fn day_of_year(year: i32, month: u32, day: u32) -> i64 {
    let d = chrono::NaiveDate::from_ymd_opt(year, month, day).expect("valid date");
    let jan1 = chrono::NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    (d - jan1).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarser_monthly_to_annual_dedups() {
        let dates = vec![RequestDate::monthly(2020, 1), RequestDate::monthly(2020, 6), RequestDate::monthly(2021, 3)];
        let out = regrain(&dates, Grain::Annual).unwrap();
        assert_eq!(out, vec![RequestDate::annual(2020), RequestDate::annual(2021)]);
    }

    #[test]
    fn coarser_daily_to_monthly_dedups() {
        let dates = vec![RequestDate::daily(2020, 1, 1), RequestDate::daily(2020, 1, 15)];
        let out = regrain(&dates, Grain::Monthly).unwrap();
        assert_eq!(out, vec![RequestDate::monthly(2020, 1)]);
    }

    #[test]
    fn finer_annual_to_monthly_fans_out_twelve() {
        let dates = vec![RequestDate::annual(2020)];
        let out = regrain(&dates, Grain::Monthly).unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(out[0], RequestDate::monthly(2020, 1));
        assert_eq!(out[11], RequestDate::monthly(2020, 12));
    }

    #[test]
    fn finer_monthly_to_daily_respects_month_length() {
        let dates = vec![RequestDate::monthly(2021, 2)];
        let out = regrain(&dates, Grain::Daily).unwrap();
        assert_eq!(out.len(), 28);
        let dates_leap = vec![RequestDate::monthly(2020, 2)];
        let out_leap = regrain(&dates_leap, Grain::Daily).unwrap();
        assert_eq!(out_leap.len(), 29);
    }

    #[test]
    fn same_grain_is_identity() {
        let dates = vec![RequestDate::annual(2020), RequestDate::annual(2021)];
        assert_eq!(regrain(&dates, Grain::Annual).unwrap(), dates);
    }

    #[test]
    fn day_of_year_matches_ordinal() {
        assert_eq!(day_of_year(2021, 2, 1), 32);
        assert_eq!(day_of_year(2020, 12, 31), 366);
    }
}
