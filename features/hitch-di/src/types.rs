use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

/// Boxed error returned by constructors and lifecycle hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything living in the environment may be shared with other threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Projects a type erased instance into a typed trait object, boxed as `Arc<C>`
pub(crate) type ViewFn = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Box<dyn Any> + Send + Sync>;

/// A constructed component
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
    views: Arc<HashMap<TypeId, ViewFn>>,
}

impl Instance {
    pub(crate) fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub(crate) fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
            views: Arc::default(),
        }
    }

    pub(crate) fn with_views(mut self, views: Arc<HashMap<TypeId, ViewFn>>) -> Self {
        self.views = views;
        self
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Returns the instance as `Arc<C>` if the component exposed a view for `C`
    pub fn view<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        let project = self.views.get(&TypeId::of::<C>())?;
        project(self.instance.clone())
            .downcast::<Arc<C>>()
            .ok()
            .map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
