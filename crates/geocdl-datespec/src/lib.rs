//! Parses the two user-facing date specifications — a compact `dates`
//! string, or separate years/months/days value strings — into a sparse,
//! sorted, deduplicated list of [`RequestDate`]s plus the [`Grain`] they
//! share.
//!
//! ```text
//! dates     = entry {"," entry}
//! entry     = single | range
//! range     = single ":" single
//! single    = YYYY | YYYY"-"M | YYYY"-"M"-"D
//!
//! values = item {"," item}
//! item   = INT | "N" | INT ":" INT ["+" INT]
//! ```
//!
//! [`regrain`] additionally re-expresses an already-parsed date list at a
//! different grain, which [`GrainNegotiator`](../geocdl_catalog/negotiate/index.html)
//! needs to hand a dataset a coarser/finer list than the one the user typed.

pub mod grammar;
pub mod regrain;

pub use grammar::{parse_dates_string, parse_num_vals_str, parse_range_str, parse_simple_date_range, parse_ymd};
pub use regrain::regrain;
