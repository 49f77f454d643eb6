//! Structural matching of components against capability contracts.

use thiserror::Error;

use crate::{
    contract::{Contract, Member, Requirement, Shape, Signature, TypeRef},
    definition::ComponentDefinition,
    registry::Registry,
};

/// A candidate method only satisfies a contract through a union return type.
///
/// The required type is one of the union members, but nothing guarantees the candidate returns it.
#[derive(Error, Debug, Clone)]
#[error("Returned union type found in '{candidate}' implementation of {contract}.{method}. Desired type {required} is present in {returned} but it cannot be determined if the desired type will be returned")]
pub struct ReturnedUnionType {
    pub candidate: String,
    pub contract: String,
    pub method: String,
    pub required: TypeRef,
    pub returned: TypeRef,
}

/// Matches registered components against contracts
pub struct Matcher<'a> {
    registry: &'a Registry,
}

impl<'a> Matcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// The first registered component satisfying the contract
    pub fn find(
        &self,
        contract: &Contract,
    ) -> Result<Option<&'a ComponentDefinition>, ReturnedUnionType> {
        for candidate in self.registry.iter() {
            if self.satisfies(candidate, contract)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    pub fn satisfies(
        &self,
        candidate: &ComponentDefinition,
        contract: &Contract,
    ) -> Result<bool, ReturnedUnionType> {
        let mut visiting = Vec::new();
        self.implements(candidate, contract, &mut visiting)
    }

    fn implements(
        &self,
        candidate: &ComponentDefinition,
        contract: &Contract,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<bool, ReturnedUnionType> {
        let key = (candidate.name.clone(), contract.name.to_string());
        // Already being checked further up, a self referencing contract holds unless
        // disproven there
        if visiting.contains(&key) {
            return Ok(true);
        }
        visiting.push(key);
        let result = self.implements_shape(candidate, contract, visiting);
        visiting.pop();
        result
    }

    fn implements_shape(
        &self,
        candidate: &ComponentDefinition,
        contract: &Contract,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<bool, ReturnedUnionType> {
        let empty = Shape::default();
        let shape = candidate.shape.as_ref().unwrap_or(&empty);

        for (attribute, requirement) in &contract.requirements {
            let Some(member) = shape.lookup(attribute) else {
                return Ok(false);
            };

            let satisfied = match (requirement, member) {
                (Requirement::Method(required), Member::Method(implemented)) => self
                    .method_satisfies(
                        candidate, contract, attribute, &implemented, required, visiting,
                    )?,
                (Requirement::Value(required), Member::Value(implemented)) => {
                    implemented == *required
                }
                _ => false,
            };

            if !satisfied {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn method_satisfies(
        &self,
        candidate: &ComponentDefinition,
        contract: &Contract,
        method: &str,
        implemented: &Signature,
        required: &Signature,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<bool, ReturnedUnionType> {
        if implemented.params.len() != required.params.len() {
            return Ok(false);
        }

        for (param, required_type) in &required.params {
            let Some(implemented_type) = implemented.params.get(param) else {
                return Ok(false);
            };

            let satisfied = implemented_type == required_type
                || implemented_type.union_contains(required_type) == Some(true);
            if !satisfied {
                return Ok(false);
            }
        }

        match (&implemented.returns, &required.returns) {
            (None, None) => Ok(true),
            (Some(returned), Some(required_type)) if returned == required_type => Ok(true),
            (Some(returned), Some(required_type)) => {
                match returned.union_contains(required_type) {
                    Some(false) => Ok(false),
                    Some(true) => Err(ReturnedUnionType {
                        candidate: candidate.name.clone(),
                        contract: contract.name.to_string(),
                        method: method.to_string(),
                        required: required_type.clone(),
                        returned: returned.clone(),
                    }),
                    None => self.return_satisfies(returned, required_type, visiting),
                }
            }
            _ => Ok(false),
        }
    }

    /// A concrete return type satisfies a contract return type if the returned type is a
    /// registered component implementing that contract
    fn return_satisfies(
        &self,
        returned: &TypeRef,
        required: &TypeRef,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<bool, ReturnedUnionType> {
        if let (TypeRef::Type(info), TypeRef::Contract(contract)) = (returned, required) {
            return match self.registry.find_by_type(info) {
                Some(returned_component) => {
                    self.implements(returned_component, contract, visiting)
                }
                None => Ok(false),
            };
        }

        Ok(returned == required)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::{definition::Component, types::TypeInfo};

    struct Console;
    struct FileLog;
    struct Broken;
    struct Session;
    struct SessionFactory;

    fn greeter() -> Contract {
        Contract::new("Greeter")
            .method(
                "greet",
                Signature::new()
                    .param("name", TypeRef::of::<String>())
                    .returns(TypeRef::of::<String>()),
            )
            .value("language", TypeRef::of::<&'static str>())
    }

    fn greet_signature() -> Signature {
        Signature::new()
            .param("name", TypeRef::of::<String>())
            .returns(TypeRef::of::<String>())
    }

    fn registry_of(definitions: Vec<ComponentDefinition>) -> Registry {
        let mut registry = Registry::new();
        registry.register(definitions).unwrap();
        registry
    }

    fn with_shape<T: Send + Sync + 'static>(value: T, shape: Shape) -> ComponentDefinition {
        Component::instance(value).shape(shape).into_definition()
    }

    #[test]
    fn exact_shape_matches() {
        let console = with_shape(
            Console,
            Shape::new()
                .method("greet", greet_signature())
                .value("language", TypeRef::of::<&'static str>()),
        );
        let registry = registry_of(vec![console]);

        let found = Matcher::new(&registry).find(&greeter()).unwrap();
        assert_eq!(found.unwrap().name(), std::any::type_name::<Console>());
    }

    #[test]
    fn annotations_satisfy_value_requirements() {
        let console = with_shape(
            Console,
            Shape::new()
                .method("greet", greet_signature())
                .annotation("language", TypeRef::of::<&'static str>()),
        );
        let registry = registry_of(vec![console]);

        assert!(Matcher::new(&registry).find(&greeter()).unwrap().is_some());
    }

    #[test]
    fn mismatches_do_not_match() {
        // value type differs
        let wrong_value = with_shape(
            Console,
            Shape::new()
                .method("greet", greet_signature())
                .value("language", TypeRef::of::<String>()),
        );
        // extra parameter
        let extra_param = with_shape(
            FileLog,
            Shape::new()
                .method("greet", greet_signature().param("loud", TypeRef::of::<bool>()))
                .value("language", TypeRef::of::<&'static str>()),
        );
        // attribute is a value instead of a method
        let not_a_method = with_shape(
            Session,
            Shape::new()
                .value("greet", TypeRef::of::<String>())
                .value("language", TypeRef::of::<&'static str>()),
        );
        let no_shape = Component::instance(Broken).into_definition();
        let registry = registry_of(vec![wrong_value, extra_param, not_a_method, no_shape]);

        assert!(Matcher::new(&registry).find(&greeter()).unwrap().is_none());
    }

    #[test]
    fn union_parameter_accepts_member() {
        let console = with_shape(
            Console,
            Shape::new()
                .method(
                    "greet",
                    Signature::new()
                        .param(
                            "name",
                            TypeRef::union([TypeInfo::of::<String>(), TypeInfo::of::<u32>()]),
                        )
                        .returns(TypeRef::of::<String>()),
                )
                .value("language", TypeRef::of::<&'static str>()),
        );
        let registry = registry_of(vec![console]);

        assert!(Matcher::new(&registry).find(&greeter()).unwrap().is_some());
    }

    #[test]
    fn identical_union_parameter_matches() {
        let input = || TypeRef::union([TypeInfo::of::<String>(), TypeInfo::of::<u32>()]);
        let parser =
            Contract::new("Parser").method("parse", Signature::new().param("input", input()));
        // member order does not matter for unions
        let console = with_shape(
            Console,
            Shape::new().method(
                "parse",
                Signature::new().param(
                    "input",
                    TypeRef::union([TypeInfo::of::<u32>(), TypeInfo::of::<String>()]),
                ),
            ),
        );
        let registry = registry_of(vec![console]);

        let found = Matcher::new(&registry).find(&parser).unwrap();
        assert_eq!(found.unwrap().name(), std::any::type_name::<Console>());
    }

    #[test]
    fn identical_union_return_matches() {
        let output = || TypeRef::union([TypeInfo::of::<String>(), TypeInfo::of::<u32>()]);
        let parser = Contract::new("Parser").method("parse", Signature::new().returns(output()));
        let console = with_shape(
            Console,
            Shape::new().method("parse", Signature::new().returns(output())),
        );
        let registry = registry_of(vec![console]);

        let found = Matcher::new(&registry).find(&parser).unwrap();
        assert_eq!(found.unwrap().name(), std::any::type_name::<Console>());
    }

    #[test]
    fn union_return_fails_loudly() {
        let broken = with_shape(
            Broken,
            Shape::new()
                .method(
                    "greet",
                    Signature::new()
                        .param("name", TypeRef::of::<String>())
                        .returns(TypeRef::union([
                            TypeInfo::of::<String>(),
                            TypeInfo::of::<Infallible>(),
                        ])),
                )
                .value("language", TypeRef::of::<&'static str>()),
        );
        let registry = registry_of(vec![broken]);

        let err = Matcher::new(&registry).find(&greeter()).unwrap_err();
        assert_eq!(err.method, "greet");
        assert_eq!(err.contract, "Greeter");
        assert_eq!(err.candidate, std::any::type_name::<Broken>());
    }

    #[test]
    fn union_return_without_required_member_is_no_match() {
        let broken = with_shape(
            Broken,
            Shape::new()
                .method(
                    "greet",
                    Signature::new()
                        .param("name", TypeRef::of::<String>())
                        .returns(TypeRef::union([TypeInfo::of::<u8>(), TypeInfo::of::<u16>()])),
                )
                .value("language", TypeRef::of::<&'static str>()),
        );
        let registry = registry_of(vec![broken]);

        assert!(Matcher::new(&registry).find(&greeter()).unwrap().is_none());
    }

    #[test]
    fn contract_return_matches_registered_implementation() {
        let session = Contract::new("Session").method("close", Signature::new());
        let factory = Contract::new("SessionFactory").method(
            "open",
            Signature::new().returns(TypeRef::contract(session)),
        );

        let registry = registry_of(vec![
            with_shape(Session, Shape::new().method("close", Signature::new())),
            with_shape(
                SessionFactory,
                Shape::new().method("open", Signature::new().returns(TypeRef::of::<Session>())),
            ),
        ]);

        let found = Matcher::new(&registry).find(&factory).unwrap();
        assert_eq!(found.unwrap().name(), std::any::type_name::<SessionFactory>());
    }

    #[test]
    fn first_registered_candidate_wins() {
        let shape = Shape::new()
            .method("greet", greet_signature())
            .value("language", TypeRef::of::<&'static str>());
        let registry = registry_of(vec![
            with_shape(FileLog, shape.clone()),
            with_shape(Console, shape),
        ]);

        for _ in 0..3 {
            let found = Matcher::new(&registry).find(&greeter()).unwrap();
            assert_eq!(found.unwrap().name(), std::any::type_name::<FileLog>());
        }
    }
}
