//! Read-only description of everything a registry exposes.
//!
//! [`Reflection`] lists classes, free functions and value types sorted by
//! name, so two runtimes over the same registrations reflect identically.
//! Its `Display` form is a pseudo-declaration listing suitable for snapshot
//! tests and for generating typings by hand.

use std::fmt;

use bindery_core::{ConversionPolicy, Ownership, TypeSpec};
use bindery_registry::{
    BoundFunction, ClassDescriptor, OverloadCandidate, TypeRegistry, ValueTypeDescriptor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub value_types: Vec<ValueTypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub bases: Vec<BaseInfo>,
    pub policy: Option<ConversionPolicy>,
    pub constructors: Vec<SignatureInfo>,
    pub methods: Vec<FunctionInfo>,
    pub static_methods: Vec<FunctionInfo>,
    pub properties: Vec<PropertyInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseInfo {
    pub name: String,
    pub is_virtual: bool,
}

/// A function with its overloads in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub policy: Option<ConversionPolicy>,
    pub overloads: Vec<SignatureInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub params: Vec<String>,
    pub ret: String,
    pub is_const: bool,
    pub policy: Option<ConversionPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTypeInfo {
    pub name: String,
    /// `(name, type)` in declaration order.
    pub fields: Vec<(String, String)>,
}

/// Declared type as written in a listing: borrowed class results are
/// pointers, shared ones smart pointers.
fn render_type(registry: &TypeRegistry, spec: &TypeSpec) -> String {
    let name = registry.spec_name(spec);
    let is_class = registry.lookup(spec.type_hash).is_ok_and(|desc| desc.is_class());
    match spec.ownership {
        Ownership::Borrowed if is_class => format!("{} *", name),
        Ownership::Shared if is_class => format!("shared<{}>", name),
        _ => name,
    }
}

fn signature(registry: &TypeRegistry, candidate: &OverloadCandidate) -> SignatureInfo {
    SignatureInfo {
        params: candidate.params.iter().map(|p| render_type(registry, p)).collect(),
        ret: render_type(registry, &candidate.ret),
        is_const: candidate.is_const,
        policy: candidate.policy,
    }
}

fn function(registry: &TypeRegistry, function: &BoundFunction) -> FunctionInfo {
    FunctionInfo {
        name: function.name.clone(),
        policy: function.policy,
        overloads: function.candidates.iter().map(|c| signature(registry, c)).collect(),
    }
}

fn functions<'a>(
    registry: &TypeRegistry,
    list: impl Iterator<Item = &'a BoundFunction>,
) -> Vec<FunctionInfo> {
    let mut infos: Vec<FunctionInfo> = list.map(|f| function(registry, f)).collect();
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    infos
}

fn class(registry: &TypeRegistry, class: &ClassDescriptor) -> ClassInfo {
    let mut properties: Vec<PropertyInfo> = class
        .properties
        .iter()
        .map(|p| PropertyInfo {
            name: p.name.clone(),
            type_name: render_type(registry, &p.spec),
            read_only: p.is_read_only(),
        })
        .collect();
    properties.sort_by(|a, b| a.name.cmp(&b.name));

    ClassInfo {
        name: class.name.clone(),
        bases: registry
            .hierarchy()
            .direct_bases(class.type_hash)
            .into_iter()
            .map(|(base, is_virtual)| BaseInfo {
                name: registry.type_name(base),
                is_virtual,
            })
            .collect(),
        policy: class.policy,
        constructors: class
            .constructors
            .candidates
            .iter()
            .map(|c| signature(registry, c))
            .collect(),
        methods: functions(registry, class.methods.iter()),
        static_methods: functions(registry, class.static_methods.iter()),
        properties,
    }
}

fn value_type(registry: &TypeRegistry, desc: &ValueTypeDescriptor) -> ValueTypeInfo {
    ValueTypeInfo {
        name: desc.name.clone(),
        fields: desc
            .fields
            .iter()
            .map(|(name, spec)| (name.clone(), render_type(registry, spec)))
            .collect(),
    }
}

impl Reflection {
    pub fn from_registry(registry: &TypeRegistry) -> Self {
        let mut classes: Vec<ClassInfo> = registry.classes().map(|c| class(registry, c)).collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        let mut value_types: Vec<ValueTypeInfo> =
            registry.value_types().map(|v| value_type(registry, v)).collect();
        value_types.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            classes,
            functions: functions(registry, registry.functions()),
            value_types,
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// ============================================================================
// Pseudo-declarations
// ============================================================================

fn write_policy(f: &mut fmt::Formatter<'_>, policy: Option<ConversionPolicy>) -> fmt::Result {
    match policy {
        Some(policy) => write!(f, " [{}]", policy.as_str()),
        None => Ok(()),
    }
}

impl SignatureInfo {
    fn write_decl(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        name: &str,
        inherited: Option<ConversionPolicy>,
    ) -> fmt::Result {
        write!(f, "{}{} {}({})", prefix, self.ret, name, self.params.join(", "))?;
        if self.is_const {
            write!(f, " const")?;
        }
        write_policy(f, self.policy.or(inherited))?;
        writeln!(f, ";")
    }
}

impl FunctionInfo {
    fn write_decls(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        for overload in &self.overloads {
            overload.write_decl(f, prefix, &self.name, self.policy)?;
        }
        Ok(())
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)?;
        for (i, base) in self.bases.iter().enumerate() {
            let separator = if i == 0 { " : " } else { ", " };
            let marker = if base.is_virtual { "virtual " } else { "" };
            write!(f, "{}{}{}", separator, marker, base.name)?;
        }
        write_policy(f, self.policy)?;
        writeln!(f, " {{")?;

        for constructor in &self.constructors {
            write!(f, "    {}({})", self.name, constructor.params.join(", "))?;
            write_policy(f, constructor.policy)?;
            writeln!(f, ";")?;
        }
        for method in &self.methods {
            method.write_decls(f, "    ")?;
        }
        for method in &self.static_methods {
            method.write_decls(f, "    static ")?;
        }
        for property in &self.properties {
            let access = if property.read_only { "readonly " } else { "" };
            writeln!(f, "    {}{} {};", access, property.type_name, property.name)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for ValueTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "value {} {{", self.name)?;
        for (name, type_name) in &self.fields {
            writeln!(f, "    {} {};", type_name, name)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value_type in &self.value_types {
            writeln!(f, "{}", value_type)?;
        }
        for class in &self.classes {
            writeln!(f, "{}", class)?;
        }
        for function in &self.functions {
            function.write_decls(f, "")?;
        }
        Ok(())
    }
}
