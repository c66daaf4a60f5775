//! TypeRegistry - the catalog of everything exposed across the boundary.
//!
//! # Storage Model
//!
//! - **Types**: every [`TypeDescriptor`] by `TypeHash`, with a name index
//! - **Functions**: free [`BoundFunction`]s by name
//! - **Classes**: [`ClassDescriptor`]s by type hash
//! - **Value types**: [`ValueTypeDescriptor`]s by type hash
//! - **Bases**: the [`Hierarchy`] graph
//!
//! # Initialization Order
//!
//! The registry is append-only and validates every signature against what is
//! already registered, so registration has to follow the dependency order:
//!
//! 1. types (primitives, classes and value types by name, derived types)
//! 2. base edges between classes
//! 3. free functions
//! 4. class members
//!
//! Referring to an unregistered type fails with
//! [`RegistrationError::UnknownType`]. Once built the registry is shared
//! read-only by the runtime.
//!
//! # Example
//!
//! ```
//! use bindery_core::{TypeSpec, primitives};
//! use bindery_registry::{BoundFunction, TypeRegistry};
//!
//! let mut registry = TypeRegistry::with_primitives();
//! let int = TypeSpec::of(primitives::INT32);
//! registry
//!     .register_function(BoundFunction::simple("incrementInt", vec![int], int, |ctx| {
//!         let x: i32 = ctx.arg(0)?;
//!         ctx.set_return(x + 1);
//!         Ok(())
//!     }))
//!     .unwrap();
//! assert!(registry.function("incrementInt").is_some());
//! ```

use bindery_core::{
    Adjustment, CallbackSignature, RegistrationError, TypeHash, TypeKind, TypeSpec, templates,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::entries::{BoundFunction, ClassDescriptor, TypeDescriptor, ValueTypeDescriptor};
use crate::hierarchy::Hierarchy;

/// Central storage for all exposed types and entry points.
#[derive(Default, Debug)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeDescriptor>,
    names: FxHashMap<String, TypeHash>,
    functions: FxHashMap<String, BoundFunction>,
    classes: FxHashMap<TypeHash, ClassDescriptor>,
    value_types: FxHashMap<TypeHash, ValueTypeDescriptor>,
    hierarchy: Hierarchy,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the primitive catalog registered.
    pub fn with_primitives() -> Self {
        let mut registry = Self::new();
        for desc in TypeDescriptor::primitives() {
            registry.names.insert(desc.name.clone(), desc.type_hash);
            registry.types.insert(desc.type_hash, desc);
        }
        registry
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Look up a type by hash.
    pub fn lookup(&self, type_hash: TypeHash) -> Result<&TypeDescriptor, RegistrationError> {
        self.types
            .get(&type_hash)
            .ok_or_else(|| RegistrationError::UnknownType(format!("{}", type_hash)))
    }

    /// Look up a type by name.
    pub fn lookup_name(&self, name: &str) -> Result<&TypeDescriptor, RegistrationError> {
        self.names
            .get(name)
            .and_then(|hash| self.types.get(hash))
            .ok_or_else(|| RegistrationError::UnknownType(name.to_string()))
    }

    pub fn contains_type(&self, type_hash: TypeHash) -> bool {
        self.types.contains_key(&type_hash)
    }

    /// Display name of a type, or its hash if unknown.
    pub fn type_name(&self, type_hash: TypeHash) -> String {
        self.types
            .get(&type_hash)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("{}", type_hash))
    }

    /// Display form of a declared type (`const Coord *`, `cstring?`).
    pub fn spec_name(&self, spec: &TypeSpec) -> String {
        let mut name = self.type_name(spec.type_hash);
        if spec.is_const() {
            name = format!("const {}", name);
        }
        if spec.is_nullable() {
            name.push('?');
        }
        name
    }

    pub fn function(&self, name: &str) -> Option<&BoundFunction> {
        self.functions.get(name)
    }

    pub fn class(&self, type_hash: TypeHash) -> Option<&ClassDescriptor> {
        self.classes.get(&type_hash)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassDescriptor> {
        self.names.get(name).and_then(|hash| self.classes.get(hash))
    }

    pub fn value_type(&self, type_hash: TypeHash) -> Option<&ValueTypeDescriptor> {
        self.value_types.get(&type_hash)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Whether a value of class `ty` can be viewed as `target`.
    pub fn is_subtype(&self, ty: TypeHash, target: TypeHash) -> bool {
        self.hierarchy.reaches(ty, target)
    }

    pub fn functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.functions.values()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn value_types(&self) -> impl Iterator<Item = &ValueTypeDescriptor> {
        self.value_types.values()
    }

    // ==========================================================================
    // Type Registration
    // ==========================================================================

    /// Register a type.
    ///
    /// Returns an error if a type with the same name already exists.
    pub fn register_type(&mut self, desc: TypeDescriptor) -> Result<TypeHash, RegistrationError> {
        if self.names.contains_key(&desc.name) || self.types.contains_key(&desc.type_hash) {
            return Err(RegistrationError::DuplicateType(desc.name));
        }
        let hash = desc.type_hash;
        debug!(name = %desc.name, kind = desc.kind.describe(), "registered type");
        self.names.insert(desc.name.clone(), hash);
        self.types.insert(hash, desc);
        Ok(hash)
    }

    /// Register a derived type unless it already exists.
    fn register_derived(&mut self, desc: TypeDescriptor) -> TypeHash {
        let hash = desc.type_hash;
        if !self.types.contains_key(&hash) {
            self.names.insert(desc.name.clone(), hash);
            self.types.insert(hash, desc);
        }
        hash
    }

    /// Register (or find) `vector<element>`.
    pub fn register_vector(&mut self, element: TypeHash) -> Result<TypeHash, RegistrationError> {
        let element_name = self.lookup(element)?.name.clone();
        let hash = TypeHash::from_template_instance(templates::VECTOR, &[element]);
        Ok(self.register_derived(TypeDescriptor::with_hash(
            format!("vector<{}>", element_name),
            hash,
            TypeKind::Vector { element },
        )))
    }

    /// Register (or find) `array<element, len>`.
    pub fn register_array(
        &mut self,
        element: TypeHash,
        len: usize,
    ) -> Result<TypeHash, RegistrationError> {
        let element_name = self.lookup(element)?.name.clone();
        let hash =
            TypeHash::from_template_instance(templates::ARRAY, &[element, TypeHash(len as u64)]);
        Ok(self.register_derived(TypeDescriptor::with_hash(
            format!("array<{}, {}>", element_name, len),
            hash,
            TypeKind::Array { element, len },
        )))
    }

    /// Register (or find) a callback signature type.
    pub fn register_callback(
        &mut self,
        signature: CallbackSignature,
    ) -> Result<TypeHash, RegistrationError> {
        let ret = self.validated_spec_name(&signature.ret)?;
        let params = signature
            .params
            .iter()
            .map(|p| self.validated_spec_name(p))
            .collect::<Result<Vec<_>, _>>()?;
        let hash = signature.type_hash();
        Ok(self.register_derived(TypeDescriptor::with_hash(
            format!("callback<{}({})>", ret, params.join(", ")),
            hash,
            TypeKind::Callback(signature),
        )))
    }

    fn validated_spec_name(&self, spec: &TypeSpec) -> Result<String, RegistrationError> {
        self.lookup(spec.type_hash)?;
        Ok(self.spec_name(spec))
    }

    /// Register a value type: its type descriptor plus field layout.
    pub fn register_value_type(
        &mut self,
        desc: ValueTypeDescriptor,
    ) -> Result<TypeHash, RegistrationError> {
        for (_, spec) in &desc.fields {
            self.lookup(spec.type_hash)?;
        }
        let hash = self.register_type(TypeDescriptor::value(desc.name.clone()))?;
        self.value_types.insert(hash, desc);
        Ok(hash)
    }

    // ==========================================================================
    // Base Registration
    // ==========================================================================

    fn require_class(&self, type_hash: TypeHash) -> Result<(), RegistrationError> {
        let desc = self.lookup(type_hash)?;
        if desc.is_class() {
            Ok(())
        } else {
            Err(RegistrationError::InvalidDeclaration(format!("{} is not a class", desc.name)))
        }
    }

    fn add_base(
        &mut self,
        derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
        is_virtual: bool,
    ) -> Result<(), RegistrationError> {
        self.require_class(derived)?;
        self.require_class(base)?;
        if self.hierarchy.has_edge(derived, base) {
            return Err(RegistrationError::DuplicateRegistration {
                name: format!("{} : {}", self.type_name(derived), self.type_name(base)),
                kind: "base".to_string(),
            });
        }
        self.hierarchy.add_base(derived, base, adjustment, is_virtual);
        Ok(())
    }

    /// Declare `base` a direct base of `derived`.
    ///
    /// # Panics
    ///
    /// Panics if the edge would create an inheritance cycle.
    pub fn register_base(
        &mut self,
        derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
    ) -> Result<(), RegistrationError> {
        self.add_base(derived, base, adjustment, false)
    }

    /// Declare `base` a shared (virtual) base of `derived`.
    ///
    /// `adjustment` locates the base when `derived` is the most-derived type;
    /// further-derived types record their own location with
    /// [`register_virtual_base_location`](Self::register_virtual_base_location).
    ///
    /// # Panics
    ///
    /// Panics if the edge would create an inheritance cycle.
    pub fn register_virtual_base(
        &mut self,
        derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
    ) -> Result<(), RegistrationError> {
        self.add_base(derived, base, adjustment, true)
    }

    /// Record where the single shared `base` subobject lives in `most_derived`.
    pub fn register_virtual_base_location(
        &mut self,
        most_derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
    ) -> Result<(), RegistrationError> {
        self.require_class(most_derived)?;
        self.require_class(base)?;
        if !self.hierarchy.is_base_of(base, most_derived) {
            return Err(RegistrationError::InvalidDeclaration(format!(
                "{} is not a base of {}",
                self.type_name(base),
                self.type_name(most_derived)
            )));
        }
        self.hierarchy.set_virtual_location(most_derived, base, adjustment);
        Ok(())
    }

    // ==========================================================================
    // Function Registration
    // ==========================================================================

    fn validate_function(&self, function: &BoundFunction) -> Result<(), RegistrationError> {
        if function.candidates.is_empty() {
            return Err(RegistrationError::InvalidDeclaration(format!(
                "{} has no overload candidates",
                function.name
            )));
        }
        for candidate in &function.candidates {
            self.lookup(candidate.ret.type_hash)?;
            for param in &candidate.params {
                self.lookup(param.type_hash)?;
            }
        }
        Ok(())
    }

    /// Assign target ids and reject candidates with identical signatures.
    fn assign_ids(
        function: &mut BoundFunction,
        kind: &str,
        id_of: impl Fn(&[TypeHash], bool) -> TypeHash,
    ) -> Result<(), RegistrationError> {
        let mut seen = Vec::with_capacity(function.candidates.len());
        for candidate in &mut function.candidates {
            let id = id_of(&candidate.param_hashes(), candidate.is_const);
            if seen.contains(&id) {
                return Err(RegistrationError::DuplicateRegistration {
                    name: function.name.clone(),
                    kind: kind.to_string(),
                });
            }
            seen.push(id);
            candidate.target.id = id;
        }
        Ok(())
    }

    /// Register a free function.
    pub fn register_function(
        &mut self,
        mut function: BoundFunction,
    ) -> Result<(), RegistrationError> {
        if self.functions.contains_key(&function.name) {
            return Err(RegistrationError::DuplicateRegistration {
                name: function.name,
                kind: "function".to_string(),
            });
        }
        self.validate_function(&function)?;
        let name = function.name.clone();
        Self::assign_ids(&mut function, "function", |params, _| {
            TypeHash::from_function(&name, params)
        })?;
        debug!(name = %function.name, overloads = function.candidates.len(), "registered function");
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    /// Register a class and its members.
    ///
    /// Declares the class type first if it has not been registered yet.
    pub fn register_class(
        &mut self,
        mut class: ClassDescriptor,
    ) -> Result<TypeHash, RegistrationError> {
        if self.classes.contains_key(&class.type_hash) {
            return Err(RegistrationError::DuplicateType(class.name));
        }
        match self.types.get_mut(&class.type_hash) {
            Some(desc) if desc.is_class() => {
                if desc.policy.is_none() {
                    desc.policy = class.policy;
                }
            }
            Some(desc) => {
                return Err(RegistrationError::InvalidDeclaration(format!(
                    "{} is registered as {}",
                    desc.name,
                    desc.kind.describe()
                )));
            }
            None => {
                let mut desc = TypeDescriptor::class(class.name.clone());
                desc.policy = class.policy;
                self.register_type(desc)?;
            }
        }

        let owner = class.type_hash;
        if class.has_constructor() {
            self.validate_function(&class.constructors)?;
        }
        for method in class.methods.iter().chain(&class.static_methods) {
            self.validate_function(method)?;
        }
        for property in &class.properties {
            self.lookup(property.spec.type_hash)?;
        }

        Self::assign_ids(&mut class.constructors, "constructor", |params, _| {
            TypeHash::from_constructor(owner, params)
        })?;
        for method in &mut class.methods {
            let name = method.name.clone();
            Self::assign_ids(method, "method", |params, is_const| {
                TypeHash::from_method(owner, &name, params, is_const)
            })?;
        }
        for method in &mut class.static_methods {
            let name = format!("{}::{}", class.name, method.name);
            Self::assign_ids(method, "static method", |params, _| {
                TypeHash::from_method(owner, &name, params, false)
            })?;
        }
        for property in &mut class.properties {
            let getter = format!("get {}", property.name);
            property.getter.id = TypeHash::from_method(owner, &getter, &[], true);
            if let Some(setter) = &mut property.setter {
                let name = format!("set {}", property.name);
                setter.id =
                    TypeHash::from_method(owner, &name, &[property.spec.type_hash], false);
            }
        }
        if let Some(destructor) = &mut class.destructor {
            destructor.id = TypeHash::from_method(owner, "~", &[], false);
        }

        debug!(
            name = %class.name,
            methods = class.methods.len(),
            statics = class.static_methods.len(),
            properties = class.properties.len(),
            "registered class"
        );
        self.classes.insert(owner, class);
        Ok(owner)
    }
}
