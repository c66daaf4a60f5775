//! Class descriptor entry.

use bindery_core::{CallContext, ConversionPolicy, NativeError, NativeFn, TypeHash, TypeSpec};

use super::{BoundFunction, OverloadCandidate};

/// A property exposed through native accessors.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub spec: TypeSpec,
    /// Called with the receiver and no arguments; returns the value.
    pub getter: NativeFn,
    /// Called with the receiver and the new value. Read-only when absent.
    pub setter: Option<NativeFn>,
}

impl PropertyDescriptor {
    pub fn read_only<G>(name: impl Into<String>, spec: TypeSpec, getter: G) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            spec,
            getter: NativeFn::new(TypeHash::EMPTY, getter),
            setter: None,
        }
    }

    pub fn read_write<G, S>(name: impl Into<String>, spec: TypeSpec, getter: G, setter: S) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
        S: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self {
            setter: Some(NativeFn::new(TypeHash::EMPTY, setter)),
            ..Self::read_only(name, spec, getter)
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

/// Members of a class type.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub type_hash: TypeHash,
    /// Default policy for every entry point of the class.
    pub policy: Option<ConversionPolicy>,
    /// Constructor overloads; the bound function carries the class name.
    pub constructors: BoundFunction,
    pub destructor: Option<NativeFn>,
    pub methods: Vec<BoundFunction>,
    pub static_methods: Vec<BoundFunction>,
    pub properties: Vec<PropertyDescriptor>,
}

/// Add a candidate to the overload set named `name`, creating it if needed.
fn add_overload(set: &mut Vec<BoundFunction>, name: String, candidate: OverloadCandidate) {
    if let Some(existing) = set.iter_mut().find(|f| f.name == name) {
        existing.candidates.push(candidate);
    } else {
        set.push(BoundFunction::new(name).with_overload(candidate));
    }
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            constructors: BoundFunction::new(name.clone()),
            name,
            policy: None,
            destructor: None,
            methods: Vec::new(),
            static_methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    // === Builder Methods ===

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Add a constructor overload. The target returns the new object with
    /// [`CallContext::set_return_object`].
    pub fn with_constructor(mut self, candidate: OverloadCandidate) -> Self {
        self.constructors.candidates.push(candidate);
        self
    }

    /// Set the destructor. It receives the object as its receiver.
    pub fn with_destructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.destructor = Some(NativeFn::new(TypeHash::EMPTY, f));
        self
    }

    /// Add an instance method overload.
    pub fn with_method(mut self, name: impl Into<String>, candidate: OverloadCandidate) -> Self {
        add_overload(&mut self.methods, name.into(), candidate);
        self
    }

    /// Add a whole instance method overload set, with its own policy.
    pub fn with_method_set(mut self, method: BoundFunction) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a static method overload.
    pub fn with_static(mut self, name: impl Into<String>, candidate: OverloadCandidate) -> Self {
        add_overload(&mut self.static_methods, name.into(), candidate);
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    // === Query Methods ===

    pub fn find_method(&self, name: &str) -> Option<&BoundFunction> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn find_static(&self, name: &str) -> Option<&BoundFunction> {
        self.static_methods.iter().find(|m| m.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_constructor(&self) -> bool {
        !self.constructors.candidates.is_empty()
    }
}
