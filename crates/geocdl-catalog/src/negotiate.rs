//! GrainNegotiator (C6): per dataset, choose a date granularity given the
//! request's inferred grain, the dataset's supported grains, and the
//! user's `grain_method`.
//!
//! Grounded in `api_core/data_request.py::_listAllowedGrains`/`_verifyGrains`.
//! Non-temporal datasets never go through this — the handler treats them as
//! a single synthetic `None` date (§4.2).

use geocdl_common::{GeoCdlError, GeoCdlResult, Grain, GrainMethod};
use std::collections::BTreeSet;

/// Grains tried, in order, before [`inferred`] (excluded) for a given
/// [`GrainMethod`]. `any` enumerates `[Annual, Monthly, Daily]` excluding
/// `inferred` — kept as the source's fixed order rather than a "true"
/// coarser-then-finer sort (Open Question, §9).
fn allowed_grains(inferred: Grain, method: GrainMethod) -> Vec<Grain> {
    use Grain::*;
    match method {
        GrainMethod::Finer => match inferred {
            Annual => vec![Monthly, Daily],
            Monthly => vec![Daily],
            Daily | None => vec![],
        },
        GrainMethod::Coarser => match inferred {
            Daily => vec![Monthly, Annual],
            Monthly => vec![Annual],
            Annual | None => vec![],
        },
        GrainMethod::Any if inferred != Grain::None => {
            [Annual, Monthly, Daily].into_iter().filter(|g| *g != inferred).collect()
        }
        GrainMethod::Any | GrainMethod::Strict | GrainMethod::Skip => vec![],
    }
}

/// Chooses a grain for one temporal dataset. Returns `Ok(Some(grain))` when
/// a grain was assigned, `Ok(None)` when `grain_method == skip` dropped the
/// dataset, and `Err` when no compatible grain exists under `strict` or any
/// of the fallback methods.
pub fn negotiate_grain(
    dataset_id: &str,
    inferred: Grain,
    supported: &BTreeSet<Grain>,
    method: GrainMethod,
) -> GeoCdlResult<Option<Grain>> {
    if supported.contains(&inferred) {
        return Ok(Some(inferred));
    }

    match method {
        GrainMethod::Strict => Err(GeoCdlError::UnsupportedGrain { dataset: dataset_id.to_string() }),
        GrainMethod::Skip => Ok(None),
        _ => {
            let candidates = allowed_grains(inferred, method);
            candidates
                .into_iter()
                .find(|g| supported.contains(g))
                .map(Some)
                .ok_or_else(|| GeoCdlError::UnsupportedGrain { dataset: dataset_id.to_string() })
        }
    }
}
