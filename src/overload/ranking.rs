//! Cost-based ranking for overload resolution.

use bindery_core::Value;

use super::{CallSite, OverloadMatch, describe_args, signature};
use crate::error::{BindError, Result};
use crate::runtime::State;

/// Find the best match from viable candidates.
///
/// Selects the candidate with the lowest total conversion cost. A tie at the
/// lowest cost is broken only by constness (a mutable receiver prefers the
/// non-const method); anything else is [`BindError::AmbiguousOverload`].
pub(crate) fn find_best_match<'f>(
    mut viable: Vec<OverloadMatch<'f>>,
    state: &State,
    site: &CallSite<'f>,
    args: &[Value],
) -> Result<OverloadMatch<'f>> {
    debug_assert!(!viable.is_empty());

    if viable.len() == 1 {
        return Ok(viable.remove(0));
    }

    viable.sort_by_key(|m| m.total_cost);
    let best_cost = viable[0].total_cost;
    let mut tied: Vec<OverloadMatch<'f>> = viable
        .into_iter()
        .take_while(|m| m.total_cost == best_cost)
        .collect();

    if tied.len() > 1 {
        break_tie(&mut tied);
    }
    if tied.len() == 1 {
        return Ok(tied.remove(0));
    }

    Err(BindError::AmbiguousOverload {
        name: site.name.to_string(),
        args: describe_args(args),
        candidates: tied
            .iter()
            .map(|m| signature(&state.registry, site.name, m.candidate))
            .collect(),
    })
}

/// Drop const candidates tied with a non-const one.
fn break_tie(tied: &mut Vec<OverloadMatch<'_>>) {
    if tied.iter().any(|m| !m.candidate.is_const) {
        tied.retain(|m| !m.candidate.is_const);
    }
}
