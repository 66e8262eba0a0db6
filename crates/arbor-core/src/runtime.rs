//! Locator for components shared by handlers (stores, settings, clients)

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{ArborError, Result};

/// Type-keyed component map, read-only once the controller is built
///
/// Components may be unsized, so trait objects are provided and looked up
/// by their trait type:
///
/// ```
/// use std::sync::Arc;
/// use arbor_core::runtime::RuntimeContext;
///
/// trait Clock: Send + Sync { fn now(&self) -> u64; }
/// struct Fixed;
/// impl Clock for Fixed { fn now(&self) -> u64 { 7 } }
///
/// let mut runtime = RuntimeContext::new();
/// runtime.provide::<dyn Clock>(Arc::new(Fixed));
/// assert_eq!(runtime.require::<dyn Clock>().unwrap().now(), 7);
/// ```
#[derive(Default)]
pub struct RuntimeContext {
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, replacing any earlier one of the same type
    pub fn provide<T>(&mut self, component: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.components.insert(TypeId::of::<T>(), Box::new(component));
    }

    pub fn with<T>(mut self, component: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.provide(component);
        self
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|component| component.downcast_ref::<Arc<T>>())
            .cloned()
    }

    pub fn require<T>(&self) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>().ok_or_else(|| ArborError::ComponentNotFound {
            type_name: type_name::<T>().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("components", &self.components.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Limits {
        max: usize,
    }

    #[test]
    fn test_provide_and_get_sized() {
        let runtime = RuntimeContext::new().with(Arc::new(Limits { max: 3 }));
        assert_eq!(runtime.get::<Limits>().unwrap().max, 3);
        assert_eq!(runtime.len(), 1);
    }

    #[test]
    fn test_require_missing_component() {
        let runtime = RuntimeContext::new();
        let err = runtime.require::<Limits>().unwrap_err();
        assert!(matches!(err, ArborError::ComponentNotFound { ref type_name } if type_name.contains("Limits")));
    }

    #[test]
    fn test_provide_replaces() {
        let mut runtime = RuntimeContext::new();
        runtime.provide(Arc::new(Limits { max: 1 }));
        runtime.provide(Arc::new(Limits { max: 2 }));
        assert_eq!(runtime.require::<Limits>().unwrap().max, 2);
        assert_eq!(runtime.len(), 1);
    }
}
