//! DateValidator (C7): reduces requested dates to what each dataset
//! actually has, under the `strict`/`all`/`overlap` policies.
//!
//! Grounded in `api_core/data_request.py::_strictDateRangeCheck`/
//! `_partialDateRangeCheck`/`_validateDateRange`. Assumes every input date
//! list is already chronologically ordered (the DateSpec Parser's
//! invariant).

use crate::capabilities::DatasetCapabilities;
use chrono::NaiveDate;
use geocdl_common::{GeoCdlError, GeoCdlResult, Grain, RequestDate, ValidateMethod};
use std::collections::{BTreeMap, BTreeSet};

/// Whether every date in `dates` (assumed sorted ascending) falls within
/// `range`, inclusive.
fn fully_within(dates: &[RequestDate], range: &(NaiveDate, NaiveDate)) -> bool {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => first.as_naive_date() >= range.0 && last.as_naive_date() <= range.1,
        _ => true,
    }
}

/// The subset of `dates` that individually fall within `range`.
fn partial_within(dates: &[RequestDate], range: &(NaiveDate, NaiveDate)) -> Vec<RequestDate> {
    dates.iter().copied().filter(|d| d.as_naive_date() >= range.0 && d.as_naive_date() <= range.1).collect()
}

/// Validates per-dataset requested dates against dataset availability.
///
/// `ds_grains` holds only datasets that survived grain negotiation (i.e.
/// were not dropped by `grain_method=skip`); `req_dates` holds the
/// candidate date list for each grain actually in use (after any
/// [`geocdl_datespec::regrain`] needed to match a negotiated grain
/// different from the inferred one).
pub fn validate_date_ranges(
    method: ValidateMethod,
    ds_grains: &BTreeMap<String, Grain>,
    req_dates: &BTreeMap<Grain, Vec<RequestDate>>,
    capabilities: &BTreeMap<String, DatasetCapabilities>,
) -> GeoCdlResult<BTreeMap<String, Vec<RequestDate>>> {
    let mut ds_avail_dates: BTreeMap<String, Vec<RequestDate>> = BTreeMap::new();
    let mut all_available = true;

    for (dsid, &grain) in ds_grains {
        let ds_req_dates = req_dates.get(&grain).map(|v| v.as_slice()).unwrap_or(&[]);
        let range = capabilities
            .get(dsid)
            .and_then(|c| c.date_ranges.get(&grain))
            .ok_or_else(|| GeoCdlError::Internal(format!("dataset \"{}\" has no date range for grain {}", dsid, grain)))?;

        if fully_within(ds_req_dates, range) {
            ds_avail_dates.insert(dsid.clone(), ds_req_dates.to_vec());
        } else {
            all_available = false;
            if method == ValidateMethod::Strict {
                return Err(GeoCdlError::RangeUnavailable);
            }
            ds_avail_dates.insert(dsid.clone(), partial_within(ds_req_dates, range));
        }
    }

    if method != ValidateMethod::Overlap || all_available {
        let total: usize = ds_avail_dates.values().map(|v| v.len()).sum();
        return if total > 0 { Ok(ds_avail_dates) } else { Err(GeoCdlError::RangeUnavailable) };
    }

    overlap_intersection(ds_grains, &ds_avail_dates)
}

/// Per-grain intersection across datasets whose own negotiated grain is at
/// least as fine as that grain: a daily dataset's dates also contribute to
/// the monthly and annual intersections (projected down to `(y,m)`/`y`),
/// matching the reference implementation's `all_years`/`all_months`
/// accumulation exactly.
fn overlap_intersection(
    ds_grains: &BTreeMap<String, Grain>,
    ds_avail_dates: &BTreeMap<String, Vec<RequestDate>>,
) -> GeoCdlResult<BTreeMap<String, Vec<RequestDate>>> {
    let used_grains: BTreeSet<Grain> = ds_grains.values().copied().collect();

    let mut annual_sets: Vec<BTreeSet<i32>> = Vec::new();
    let mut monthly_sets: Vec<BTreeSet<(i32, u8)>> = Vec::new();
    let mut daily_sets: Vec<BTreeSet<(i32, u8, u8)>> = Vec::new();

    for (dsid, &grain) in ds_grains {
        let dates = &ds_avail_dates[dsid];
        match grain {
            Grain::Annual => {
                annual_sets.push(dates.iter().map(|d| d.year).collect());
            }
            Grain::Monthly => {
                annual_sets.push(dates.iter().map(|d| d.year).collect());
                monthly_sets.push(dates.iter().map(|d| (d.year, d.month.unwrap())).collect());
            }
            Grain::Daily => {
                annual_sets.push(dates.iter().map(|d| d.year).collect());
                monthly_sets.push(dates.iter().map(|d| (d.year, d.month.unwrap())).collect());
                daily_sets.push(dates.iter().map(|d| (d.year, d.month.unwrap(), d.day.unwrap())).collect());
            }
            Grain::None => {}
        }
    }

    let mut grain_intersection: BTreeMap<Grain, Vec<RequestDate>> = BTreeMap::new();
    if used_grains.contains(&Grain::Annual) {
        let years = intersect_all(&annual_sets);
        grain_intersection.insert(Grain::Annual, years.into_iter().map(RequestDate::annual).collect());
    }
    if used_grains.contains(&Grain::Monthly) {
        let months = intersect_all(&monthly_sets);
        grain_intersection.insert(Grain::Monthly, months.into_iter().map(|(y, m)| RequestDate::monthly(y, m)).collect());
    }
    if used_grains.contains(&Grain::Daily) {
        let days = intersect_all(&daily_sets);
        grain_intersection.insert(Grain::Daily, days.into_iter().map(|(y, m, d)| RequestDate::daily(y, m, d)).collect());
    }

    let mut overlapping = BTreeMap::new();
    for (dsid, &grain) in ds_grains {
        let dates = grain_intersection.get(&grain).cloned().unwrap_or_default();
        if dates.is_empty() {
            return Err(GeoCdlError::RangeUnavailable);
        }
        overlapping.insert(dsid.clone(), dates);
    }
    Ok(overlapping)
}

fn intersect_all<T: Ord + Clone>(sets: &[BTreeSet<T>]) -> Vec<T> {
    let mut iter = sets.iter();
    let Some(first) = iter.next() else { return Vec::new() };
    let mut acc: BTreeSet<T> = first.clone();
    for s in iter {
        acc = acc.intersection(s).cloned().collect();
    }
    acc.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocdl_common::{Crs, GridUnit};

    fn caps(id: &str, grain: Grain, range: (NaiveDate, NaiveDate)) -> DatasetCapabilities {
        let mut date_ranges = BTreeMap::new();
        date_ranges.insert(grain, range);
        DatasetCapabilities {
            id: id.to_string(),
            name: id.to_string(),
            nontemporal: false,
            supported_grains: [grain].into_iter().collect(),
            date_ranges,
            crs: Crs::wgs84(),
            grid_size: 1.0,
            grid_unit: GridUnit::Degrees,
            categorical: false,
            variable_categories: BTreeMap::new(),
            publish: true,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn strict_passes_when_fully_available() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(Grain::Annual, vec![RequestDate::annual(2000), RequestDate::annual(2002)])]);
        let capabilities = BTreeMap::from([("A".to_string(), caps("A", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1))))]);
        let result = validate_date_ranges(ValidateMethod::Strict, &ds_grains, &req_dates, &capabilities).unwrap();
        assert_eq!(result["A"].len(), 2);
    }

    #[test]
    fn strict_fails_when_partially_unavailable() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(Grain::Annual, vec![RequestDate::annual(2000), RequestDate::annual(2020)])]);
        let capabilities = BTreeMap::from([("A".to_string(), caps("A", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1))))]);
        assert!(matches!(
            validate_date_ranges(ValidateMethod::Strict, &ds_grains, &req_dates, &capabilities),
            Err(GeoCdlError::RangeUnavailable)
        ));
    }

    #[test]
    fn all_keeps_available_subset() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(Grain::Annual, vec![RequestDate::annual(2000), RequestDate::annual(2020)])]);
        let capabilities = BTreeMap::from([("A".to_string(), caps("A", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1))))]);
        let result = validate_date_ranges(ValidateMethod::All, &ds_grains, &req_dates, &capabilities).unwrap();
        assert_eq!(result["A"], vec![RequestDate::annual(2000)]);
    }

    #[test]
    fn all_fails_when_nothing_available() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(Grain::Annual, vec![RequestDate::annual(2020)])]);
        let capabilities = BTreeMap::from([("A".to_string(), caps("A", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1))))]);
        assert!(matches!(
            validate_date_ranges(ValidateMethod::All, &ds_grains, &req_dates, &capabilities),
            Err(GeoCdlError::RangeUnavailable)
        ));
    }

    #[test]
    fn overlap_intersects_monthly_datasets() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Monthly), ("B".to_string(), Grain::Monthly)]);
        let req_dates = BTreeMap::from([(
            Grain::Monthly,
            vec![RequestDate::monthly(2015, 1), RequestDate::monthly(2015, 2), RequestDate::monthly(2015, 3)],
        )]);
        let capabilities = BTreeMap::from([
            ("A".to_string(), caps("A", Grain::Monthly, (ymd(2014, 1, 1), ymd(2016, 1, 1)))),
            ("B".to_string(), caps("B", Grain::Monthly, (ymd(2015, 2, 1), ymd(2015, 2, 28)))),
        ]);
        let result = validate_date_ranges(ValidateMethod::Overlap, &ds_grains, &req_dates, &capabilities).unwrap();
        assert_eq!(result["A"], vec![RequestDate::monthly(2015, 2)]);
        assert_eq!(result["B"], vec![RequestDate::monthly(2015, 2)]);
    }

    /// Testable property 4: for identical inputs, `strict` dates ⊆ `all`
    /// dates, and (when strict succeeds) `overlap` dates ⊆ `strict` dates.
    #[test]
    fn validation_monotonicity_strict_all_overlap() {
        let ds_grains =
            BTreeMap::from([("A".to_string(), Grain::Annual), ("B".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(
            Grain::Annual,
            vec![RequestDate::annual(2000), RequestDate::annual(2001), RequestDate::annual(2002)],
        )]);
        let capabilities = BTreeMap::from([
            ("A".to_string(), caps("A", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1)))),
            ("B".to_string(), caps("B", Grain::Annual, (ymd(1990, 1, 1), ymd(2010, 1, 1)))),
        ]);

        let strict = validate_date_ranges(ValidateMethod::Strict, &ds_grains, &req_dates, &capabilities).unwrap();
        let all = validate_date_ranges(ValidateMethod::All, &ds_grains, &req_dates, &capabilities).unwrap();
        let overlap = validate_date_ranges(ValidateMethod::Overlap, &ds_grains, &req_dates, &capabilities).unwrap();

        for dsid in ["A", "B"] {
            let strict_set: BTreeSet<_> = strict[dsid].iter().collect();
            let all_set: BTreeSet<_> = all[dsid].iter().collect();
            let overlap_set: BTreeSet<_> = overlap[dsid].iter().collect();
            assert!(strict_set.is_subset(&all_set), "strict ⊆ all for {dsid}");
            assert!(overlap_set.is_subset(&strict_set), "overlap ⊆ strict for {dsid}");
        }
    }

    #[test]
    fn overlap_fails_when_intersection_empty() {
        let ds_grains = BTreeMap::from([("A".to_string(), Grain::Annual), ("B".to_string(), Grain::Annual)]);
        let req_dates = BTreeMap::from([(Grain::Annual, vec![RequestDate::annual(2000), RequestDate::annual(2001)])]);
        let capabilities = BTreeMap::from([
            ("A".to_string(), caps("A", Grain::Annual, (ymd(2000, 1, 1), ymd(2000, 12, 31)))),
            ("B".to_string(), caps("B", Grain::Annual, (ymd(2001, 1, 1), ymd(2001, 12, 31)))),
        ]);
        assert!(matches!(
            validate_date_ranges(ValidateMethod::Overlap, &ds_grains, &req_dates, &capabilities),
            Err(GeoCdlError::RangeUnavailable)
        ));
    }
}
