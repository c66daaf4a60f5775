//! Bound functions and their overload candidates.

use bindery_core::{
    CallContext, ConversionPolicy, NativeCallable, NativeError, NativeFn, TypeHash, TypeSpec,
};

/// One fixed signature of a bound function.
#[derive(Debug, Clone)]
pub struct OverloadCandidate {
    pub params: Vec<TypeSpec>,
    pub ret: TypeSpec,
    /// Native target. Its id is assigned when the owner is registered.
    pub target: NativeFn,
    /// Call-site policy for this candidate.
    pub policy: Option<ConversionPolicy>,
    /// Callable through const receivers.
    pub is_const: bool,
}

impl OverloadCandidate {
    pub fn new<F>(params: Vec<TypeSpec>, ret: TypeSpec, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self::from_callable(params, ret, f)
    }

    /// Build from any [`NativeCallable`].
    pub fn from_callable<F>(params: Vec<TypeSpec>, ret: TypeSpec, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            params,
            ret,
            target: NativeFn::new(TypeHash::EMPTY, f),
            policy: None,
            is_const: false,
        }
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Mark as a const method.
    pub fn as_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_hashes(&self) -> Vec<TypeHash> {
        self.params.iter().map(|p| p.type_hash).collect()
    }
}

/// A named entry point with an ordered, closed list of candidates.
#[derive(Debug, Clone)]
pub struct BoundFunction {
    pub name: String,
    /// Policy applying to every candidate that does not set its own.
    pub policy: Option<ConversionPolicy>,
    pub candidates: Vec<OverloadCandidate>,
}

impl BoundFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Add a candidate.
    pub fn with_overload(mut self, candidate: OverloadCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Shorthand for a single-signature function.
    pub fn simple<F>(name: impl Into<String>, params: Vec<TypeSpec>, ret: TypeSpec, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self::new(name).with_overload(OverloadCandidate::new(params, ret, f))
    }

    pub fn is_overloaded(&self) -> bool {
        self.candidates.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::primitives;

    fn noop(_: &mut CallContext<'_>) -> Result<(), NativeError> {
        Ok(())
    }

    #[test]
    fn builder_collects_candidates() {
        let f = BoundFunction::new("multiTest")
            .with_overload(OverloadCandidate::new(
                vec![TypeSpec::of(primitives::INT32)],
                TypeSpec::of(primitives::INT32),
                noop,
            ))
            .with_overload(
                OverloadCandidate::new(
                    vec![TypeSpec::of(primitives::INT32), TypeSpec::of(primitives::INT32)],
                    TypeSpec::of(primitives::INT32),
                    noop,
                )
                .with_policy(ConversionPolicy::Strict),
            );

        assert!(f.is_overloaded());
        assert_eq!(f.candidates[1].arity(), 2);
        assert_eq!(f.candidates[1].policy, Some(ConversionPolicy::Strict));
        assert!(f.candidates[0].target.id.is_empty());
    }

    #[test]
    fn const_candidate() {
        let c = OverloadCandidate::new(vec![], TypeSpec::void(), noop).as_const();
        assert!(c.is_const);
        assert!(c.param_hashes().is_empty());
    }
}
