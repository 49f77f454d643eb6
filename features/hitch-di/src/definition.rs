use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    future::Future,
    marker::PhantomData,
    sync::Arc,
};

use futures::{future::LocalBoxFuture, FutureExt};
use indexmap::IndexMap;

use crate::{
    contract::{Capability, Contract, Shape, TypeRef},
    errors::{InjectError, RequireError},
    lifecycle::Phase,
    types::{DynError, Injectable, Instance, TypeInfo, ViewFn},
};

pub(crate) type ConstructorFn =
    Arc<dyn Fn(&Dependencies) -> Result<Instance, DynError> + Send + Sync>;

/// Future returned by an async lifecycle hook
pub type HookFuture = LocalBoxFuture<'static, Result<(), DynError>>;

/// What a constructor parameter requires
#[derive(Clone, Debug)]
pub enum Dependency {
    /// Exactly this type
    Concrete(TypeInfo),
    /// Any component structurally satisfying the contract
    Contract(Arc<Contract>),
}

impl Dependency {
    pub fn required(&self) -> TypeRef {
        match self {
            Dependency::Concrete(info) => TypeRef::Type(*info),
            Dependency::Contract(contract) => TypeRef::Contract(contract.clone()),
        }
    }
}

/// A type erased lifecycle hook
#[derive(Clone)]
pub enum LifecycleHook {
    Async(Arc<dyn Fn(Instance) -> HookFuture + Send + Sync>),
    Blocking(Arc<dyn Fn(Instance) -> Result<(), DynError> + Send + Sync>),
}

impl LifecycleHook {
    pub fn is_async(&self) -> bool {
        matches!(self, LifecycleHook::Async(_))
    }

    fn asynchronous<T, F, Fut, E>(hook: F) -> Self
    where
        T: Injectable,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<DynError>,
    {
        LifecycleHook::Async(Arc::new(move |instance: Instance| -> HookFuture {
            match downcast_for_hook::<T>(&instance) {
                Ok(this) => {
                    let fut = hook(this);
                    async move {
                        let result: Result<(), DynError> = fut.await.map_err(Into::into);
                        result
                    }
                    .boxed_local()
                }
                Err(e) => futures::future::ready(Err(e)).boxed_local(),
            }
        }))
    }

    fn blocking<T, F, E>(hook: F) -> Self
    where
        T: Injectable,
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
        E: Into<DynError>,
    {
        LifecycleHook::Blocking(Arc::new(move |instance: Instance| -> Result<(), DynError> {
            let this = downcast_for_hook::<T>(&instance)?;
            hook(this).map_err(Into::into)
        }))
    }
}

fn downcast_for_hook<T: Injectable>(instance: &Instance) -> Result<Arc<T>, DynError> {
    instance.downcast::<T>().map_err(|actual_type| {
        Box::new(RequireError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        }) as DynError
    })
}

/// A type erased component definition as stored in the registry
#[derive(Clone)]
pub struct ComponentDefinition {
    pub(crate) name: String,
    pub(crate) info: TypeInfo,
    /// None = the definition never declared its dependencies
    pub(crate) dependencies: Option<IndexMap<String, Dependency>>,
    pub(crate) constructor: Option<ConstructorFn>,
    pub(crate) shape: Option<Shape>,
    pub(crate) views: Arc<HashMap<TypeId, ViewFn>>,
    pub(crate) on_start: Option<LifecycleHook>,
    pub(crate) on_run: Option<LifecycleHook>,
    pub(crate) on_stop: Option<LifecycleHook>,
}

impl ComponentDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    pub fn dependencies(&self) -> Option<&IndexMap<String, Dependency>> {
        self.dependencies.as_ref()
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn hook(&self, phase: Phase) -> Option<&LifecycleHook> {
        match phase {
            Phase::Start => self.on_start.as_ref(),
            Phase::Run => self.on_run.as_ref(),
            Phase::Stop => self.on_stop.as_ref(),
        }
    }
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Typed builder for a [ComponentDefinition]
///
/// ```ignore
/// Component::<Api>::new()
///     .depends_on::<Database>("db")
///     .requires::<dyn Clock>("clock")
///     .constructor(|deps| Ok::<_, DynError>(Api::new(deps.get("db")?, deps.get_as("clock")?)))
///     .on_start(|api| async move { api.listen().await })
///     .on_stop_blocking(|api| api.close());
/// ```
pub struct Component<T: Injectable> {
    definition: ComponentDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Default for Component<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Injectable> Component<T> {
    pub fn new() -> Self {
        let info = TypeInfo::of::<T>();
        Component {
            definition: ComponentDefinition {
                name: info.type_name.to_string(),
                info,
                dependencies: None,
                constructor: None,
                shape: None,
                views: Arc::default(),
                on_start: None,
                on_run: None,
                on_stop: None,
            },
            _marker: PhantomData,
        }
    }

    /// A component handing out an already created value
    pub fn instance(value: T) -> Self {
        let value = Arc::new(value);
        let mut component = Self::new().no_dependencies();
        component.definition.constructor = Some(Arc::new(
            move |_: &Dependencies| -> Result<Instance, DynError> {
                Ok(Instance::from_arc(value.clone()))
            },
        ));
        component
    }

    /// Declares that the constructor takes no dependencies
    pub fn no_dependencies(mut self) -> Self {
        self.definition.dependencies.get_or_insert_with(IndexMap::new);
        self
    }

    /// Declares a parameter requiring exactly `D`
    pub fn depends_on<D: Injectable>(self, param: impl Into<String>) -> Self {
        self.declare(param, Dependency::Concrete(TypeInfo::of::<D>()))
    }

    /// Declares a parameter requiring anything satisfying the contract of `C`
    pub fn requires<C: Capability + ?Sized>(self, param: impl Into<String>) -> Self {
        self.requires_contract(param, C::contract())
    }

    pub fn requires_contract(self, param: impl Into<String>, contract: Contract) -> Self {
        self.declare(param, Dependency::Contract(Arc::new(contract)))
    }

    fn declare(mut self, param: impl Into<String>, dependency: Dependency) -> Self {
        self.definition
            .dependencies
            .get_or_insert_with(IndexMap::new)
            .insert(param.into(), dependency);
        self
    }

    pub fn constructor<F, E>(mut self, constructor: F) -> Self
    where
        F: Fn(&Dependencies) -> Result<T, E> + Send + Sync + 'static,
        E: Into<DynError>,
    {
        self.definition.constructor = Some(Arc::new(
            move |deps: &Dependencies| -> Result<Instance, DynError> {
                constructor(deps).map(Instance::new).map_err(Into::into)
            },
        ));
        self
    }

    /// Declares the attributes this component offers to contract matching
    pub fn shape(mut self, shape: Shape) -> Self {
        self.definition.shape = Some(shape);
        self
    }

    /// Lets dependers retrieve this component as `Arc<C>`
    pub fn expose<C, F>(mut self, project: F) -> Self
    where
        C: ?Sized + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        let view: ViewFn = Arc::new(move |any: Arc<dyn Any + Send + Sync>| {
            match any.downcast::<T>() {
                Ok(this) => Box::new(project(this)) as Box<dyn Any>,
                Err(_) => Box::new(()) as Box<dyn Any>,
            }
        });
        Arc::make_mut(&mut self.definition.views).insert(TypeId::of::<C>(), view);
        self
    }

    pub fn on_start<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<DynError>,
    {
        self.definition.on_start = Some(LifecycleHook::asynchronous::<T, _, _, _>(hook));
        self
    }

    /// Registers a blocking start hook. Start hooks must be async, so running a harness holding
    /// one fails the start phase.
    pub fn on_start_blocking<F, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
        E: Into<DynError>,
    {
        self.definition.on_start = Some(LifecycleHook::blocking::<T, _, _>(hook));
        self
    }

    pub fn on_run<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<DynError>,
    {
        self.definition.on_run = Some(LifecycleHook::asynchronous::<T, _, _, _>(hook));
        self
    }

    /// Registers a blocking run hook. Like start hooks, run hooks must be async.
    pub fn on_run_blocking<F, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
        E: Into<DynError>,
    {
        self.definition.on_run = Some(LifecycleHook::blocking::<T, _, _>(hook));
        self
    }

    pub fn on_stop<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<DynError>,
    {
        self.definition.on_stop = Some(LifecycleHook::asynchronous::<T, _, _, _>(hook));
        self
    }

    pub fn on_stop_blocking<F, E>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Result<(), E> + Send + Sync + 'static,
        E: Into<DynError>,
    {
        self.definition.on_stop = Some(LifecycleHook::blocking::<T, _, _>(hook));
        self
    }

    pub fn into_definition(self) -> ComponentDefinition {
        self.definition
    }
}

impl<T: Injectable> From<Component<T>> for ComponentDefinition {
    fn from(component: Component<T>) -> Self {
        component.definition
    }
}

/// Dependencies handed to a constructor, keyed by parameter name
pub struct Dependencies {
    pub(crate) component: String,
    pub(crate) resolved: IndexMap<String, Instance>,
}

impl Dependencies {
    /// The component being constructed
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn instance(&self, param: &str) -> Result<&Instance, InjectError> {
        self.resolved
            .get(param)
            .ok_or_else(|| InjectError::UnknownParameter(param.to_string()))
    }

    /// The dependency injected for `param` as its concrete type
    pub fn get<T: Injectable>(&self, param: &str) -> Result<Arc<T>, InjectError> {
        let instance = self.instance(param)?;
        let downcasted =
            instance
                .downcast::<T>()
                .map_err(|actual_type| RequireError::DowncastFailed {
                    required_type: type_name::<T>(),
                    actual_type,
                })?;
        Ok(downcasted)
    }

    /// The dependency injected for `param` through the view it exposes for `C`
    pub fn get_as<C: ?Sized + 'static>(&self, param: &str) -> Result<Arc<C>, InjectError> {
        let instance = self.instance(param)?;
        instance.view::<C>().ok_or_else(|| {
            RequireError::ViewMissing {
                required_type: type_name::<C>(),
                actual_type: instance.info.type_name,
            }
            .into()
        })
    }
}

/// Anything that can be passed to `Harness::provide`
pub trait IntoDefinitions {
    fn into_definitions(self) -> Vec<ComponentDefinition>;
}

impl IntoDefinitions for ComponentDefinition {
    fn into_definitions(self) -> Vec<ComponentDefinition> {
        vec![self]
    }
}

impl<T: Injectable> IntoDefinitions for Component<T> {
    fn into_definitions(self) -> Vec<ComponentDefinition> {
        vec![self.definition]
    }
}

impl<D: IntoDefinitions> IntoDefinitions for Vec<D> {
    fn into_definitions(self) -> Vec<ComponentDefinition> {
        self.into_iter()
            .flat_map(IntoDefinitions::into_definitions)
            .collect()
    }
}

macro_rules! impl_into_definitions_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoDefinitions),+> IntoDefinitions for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_definitions(self) -> Vec<ComponentDefinition> {
                let ($($name,)+) = self;
                let mut definitions = Vec::new();
                $(definitions.extend($name.into_definitions());)+
                definitions
            }
        }
    };
}

impl_into_definitions_for_tuple!(A);
impl_into_definitions_for_tuple!(A, B);
impl_into_definitions_for_tuple!(A, B, C);
impl_into_definitions_for_tuple!(A, B, C, D);
impl_into_definitions_for_tuple!(A, B, C, D, E);
impl_into_definitions_for_tuple!(A, B, C, D, E, F);
impl_into_definitions_for_tuple!(A, B, C, D, E, F, G);
impl_into_definitions_for_tuple!(A, B, C, D, E, F, G, H);
impl_into_definitions_for_tuple!(A, B, C, D, E, F, G, H, I);
impl_into_definitions_for_tuple!(A, B, C, D, E, F, G, H, I, J);
