//! Structural descriptions used to match components against capability contracts.
//!
//! A [Contract] names a set of required attributes. A component describes what it offers with a
//! [Shape]. Neither side declares conformance to the other: the [Matcher](crate::matcher::Matcher)
//! decides by comparing the two descriptions while the dependency graph is built.

use std::{borrow::Cow, fmt, sync::Arc};

use indexmap::IndexMap;

use crate::types::TypeInfo;

/// A type as it appears in a signature or a value slot
#[derive(Clone)]
pub enum TypeRef {
    /// A single concrete type
    Type(TypeInfo),
    /// A sum type, any one of the listed members
    Union(Vec<TypeInfo>),
    /// Anything satisfying the given contract
    Contract(Arc<Contract>),
}

impl TypeRef {
    pub fn of<T: 'static + ?Sized>() -> Self {
        TypeRef::Type(TypeInfo::of::<T>())
    }

    pub fn union(members: impl IntoIterator<Item = TypeInfo>) -> Self {
        TypeRef::Union(members.into_iter().collect())
    }

    pub fn contract(contract: Contract) -> Self {
        TypeRef::Contract(Arc::new(contract))
    }

    /// Whether `required` is one of the members of this union
    pub(crate) fn union_contains(&self, required: &TypeRef) -> Option<bool> {
        let TypeRef::Union(members) = self else {
            return None;
        };
        Some(match required {
            TypeRef::Type(info) => members.contains(info),
            _ => false,
        })
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeRef::Type(a), TypeRef::Type(b)) => a == b,
            // Unions compare as sets
            (TypeRef::Union(a), TypeRef::Union(b)) => {
                a.iter().all(|t| b.contains(t)) && b.iter().all(|t| a.contains(t))
            }
            (TypeRef::Contract(a), TypeRef::Contract(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Type(info) => f.write_str(info.type_name),
            TypeRef::Union(members) => {
                let names: Vec<_> = members.iter().map(|m| m.type_name).collect();
                write!(f, "Union[{}]", names.join(", "))
            }
            TypeRef::Contract(contract) => write!(f, "{}", contract.name),
        }
    }
}

/// Parameter name to type mapping of a method, plus its return type
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    pub params: IndexMap<String, TypeRef>,
    pub returns: Option<TypeRef>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.insert(name.into(), ty);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.returns = Some(ty);
        self
    }
}

/// An attribute a contract requires
#[derive(Clone, Debug)]
pub enum Requirement {
    /// A typed value slot
    Value(TypeRef),
    /// A method with the given signature
    Method(Signature),
}

/// A named set of required attributes, satisfied structurally
#[derive(Clone, Debug)]
pub struct Contract {
    pub name: Cow<'static, str>,
    pub requirements: IndexMap<String, Requirement>,
}

impl Contract {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            requirements: IndexMap::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.requirements.insert(name.into(), Requirement::Value(ty));
        self
    }

    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.requirements
            .insert(name.into(), Requirement::Method(signature));
        self
    }
}

/// A contract bound to a Rust type, usually the trait object the contract describes.
///
/// ```ignore
/// impl Capability for dyn Greeter {
///     fn contract() -> Contract {
///         Contract::new("Greeter").method(
///             "greet",
///             Signature::new()
///                 .param("name", TypeRef::of::<String>())
///                 .returns(TypeRef::of::<String>()),
///         )
///     }
/// }
/// ```
pub trait Capability: 'static {
    fn contract() -> Contract;
}

/// A concrete attribute of a component
#[derive(Clone, Debug)]
pub enum Member {
    Value(TypeRef),
    Method(Signature),
}

/// What a component offers for structural matching.
///
/// Members are the concrete attributes. Annotations are typed slots declared without a concrete
/// member and are only consulted when no member of that name exists.
#[derive(Clone, Debug, Default)]
pub struct Shape {
    pub members: IndexMap<String, Member>,
    pub annotations: IndexMap<String, TypeRef>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.members.insert(name.into(), Member::Method(signature));
        self
    }

    pub fn value(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.members.insert(name.into(), Member::Value(ty));
        self
    }

    pub fn annotation(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.annotations.insert(name.into(), ty);
        self
    }

    /// Looks up an attribute, falling back to the declared annotations
    pub(crate) fn lookup(&self, name: &str) -> Option<Member> {
        match self.members.get(name) {
            Some(member) => Some(member.clone()),
            None => self.annotations.get(name).cloned().map(Member::Value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unions_compare_as_sets() {
        let a = TypeRef::union([TypeInfo::of::<u8>(), TypeInfo::of::<String>()]);
        let b = TypeRef::union([TypeInfo::of::<String>(), TypeInfo::of::<u8>()]);
        let c = TypeRef::union([TypeInfo::of::<String>()]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(c, TypeRef::of::<String>());
    }

    #[test]
    fn contracts_compare_by_name() {
        let a = TypeRef::contract(Contract::new("Clock"));
        let b = TypeRef::contract(Contract::new("Clock").value("now", TypeRef::of::<u64>()));

        assert_eq!(a, b);
        assert_ne!(a, TypeRef::contract(Contract::new("Timer")));
    }

    #[test]
    fn lookup_falls_back_to_annotations() {
        let shape = Shape::new()
            .method("tick", Signature::new())
            .annotation("period", TypeRef::of::<u64>());

        assert!(matches!(shape.lookup("tick"), Some(Member::Method(_))));
        assert!(matches!(
            shape.lookup("period"),
            Some(Member::Value(ty)) if ty == TypeRef::of::<u64>()
        ));
        assert!(shape.lookup("missing").is_none());
    }
}
