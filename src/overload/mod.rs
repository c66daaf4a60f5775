//! Overload resolution for calls from the dynamic side.
//!
//! ## Algorithm
//!
//! 1. Filter candidates by argument count
//! 2. For const receivers, drop non-const candidates
//! 3. Price every argument conversion under the parameter's effective policy
//! 4. Rank viable candidates by total cost; a tie at the lowest cost is an
//!    error, not a guess
//!
//! When exactly one candidate is left after steps 1 and 2, its own conversion
//! failure is reported, which says more than "no matching overload".

mod ranking;

pub(crate) use ranking::find_best_match;

use bindery_core::{ConversionPolicy, TypeSpec, Value};
use bindery_registry::{BoundFunction, ClassDescriptor, OverloadCandidate, TypeRegistry};

use crate::convert::{Conversion, find_conversion};
use crate::error::{BindError, Result};
use crate::runtime::State;

/// What is being called.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite<'f> {
    /// Name shown in errors, e.g. `Overload.test`.
    pub name: &'f str,
    pub function: &'f BoundFunction,
    /// Class declaring the function, for class-level policy.
    pub owner: Option<&'f ClassDescriptor>,
    /// Constness of the receiver for method calls.
    pub receiver_const: Option<bool>,
}

/// Result of successful overload resolution.
#[derive(Debug, Clone)]
pub(crate) struct OverloadMatch<'f> {
    pub candidate: &'f OverloadCandidate,
    /// Effective policy of each parameter.
    pub policies: Vec<ConversionPolicy>,
    pub arg_conversions: Vec<Conversion>,
    pub total_cost: u32,
}

/// Policy for one parameter: the most specific declaration wins.
pub(crate) fn effective_policy(
    state: &State,
    site: &CallSite<'_>,
    candidate: &OverloadCandidate,
    param: &TypeSpec,
) -> ConversionPolicy {
    param
        .policy
        .or(candidate.policy)
        .or(site.function.policy)
        .or(site.owner.and_then(|class| class.policy))
        .or_else(|| state.registry.lookup(param.type_hash).ok().and_then(|desc| desc.policy))
        .unwrap_or(state.default_policy)
}

/// Select the candidate to call for `args`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn resolve_overload<'f>(
    state: &State,
    site: &CallSite<'f>,
    args: &[Value],
) -> Result<OverloadMatch<'f>> {
    let by_arity: Vec<&'f OverloadCandidate> = site
        .function
        .candidates
        .iter()
        .filter(|candidate| candidate.arity() == args.len())
        .collect();
    if by_arity.is_empty() {
        return Err(no_matching_overload_error(state, site, args));
    }

    let callable: Vec<&'f OverloadCandidate> = if site.receiver_const == Some(true) {
        by_arity.into_iter().filter(|candidate| candidate.is_const).collect()
    } else {
        by_arity
    };
    if callable.is_empty() {
        let class = site.owner.map(|c| c.name.as_str()).unwrap_or("object");
        return Err(BindError::type_mismatch(
            format!("mutable receiver for {}", site.name),
            format!("const {}", class),
        ));
    }

    // Fast path: report the precise failure
    if let [candidate] = callable.as_slice() {
        return try_match_candidate(state, site, *candidate, args);
    }

    let viable: Vec<_> = callable
        .into_iter()
        .filter_map(|candidate| try_match_candidate(state, site, candidate, args).ok())
        .collect();
    if viable.is_empty() {
        return Err(no_matching_overload_error(state, site, args));
    }
    find_best_match(viable, state, site, args)
}

fn try_match_candidate<'f>(
    state: &State,
    site: &CallSite<'f>,
    candidate: &'f OverloadCandidate,
    args: &[Value],
) -> Result<OverloadMatch<'f>> {
    let mut policies = Vec::with_capacity(args.len());
    let mut arg_conversions = Vec::with_capacity(args.len());
    let mut total_cost = 0u32;

    for (arg, param) in args.iter().zip(&candidate.params) {
        let policy = effective_policy(state, site, candidate, param);
        let conversion = find_conversion(state, arg, param, policy)?;
        total_cost = total_cost.saturating_add(conversion.cost);
        policies.push(policy);
        arg_conversions.push(conversion);
    }

    Ok(OverloadMatch {
        candidate,
        policies,
        arg_conversions,
        total_cost,
    })
}

/// Readable signature, e.g. `test(int32, string) const`.
pub(crate) fn signature(
    registry: &TypeRegistry,
    name: &str,
    candidate: &OverloadCandidate,
) -> String {
    let params: Vec<String> = candidate.params.iter().map(|p| registry.spec_name(p)).collect();
    let mut signature = format!("{}({})", name, params.join(", "));
    if candidate.is_const {
        signature.push_str(" const");
    }
    signature
}

/// Kind of each supplied argument, naming the class of proxies.
pub(crate) fn describe_args(args: &[Value]) -> Vec<String> {
    args.iter()
        .map(|arg| match arg.as_proxy() {
            Some(proxy) => proxy.class_name().to_string(),
            None => arg.type_name().to_string(),
        })
        .collect()
}

fn no_matching_overload_error(state: &State, site: &CallSite<'_>, args: &[Value]) -> BindError {
    BindError::NoMatchingOverload {
        name: site.name.to_string(),
        args: describe_args(args),
        candidates: site
            .function
            .candidates
            .iter()
            .map(|candidate| signature(&state.registry, site.name, candidate))
            .collect(),
    }
}
