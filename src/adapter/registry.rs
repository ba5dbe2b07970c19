//! Process-wide adapter catalog keyed by entity type.
//!
//! Adapters are registered once at startup and looked up read-only for the
//! rest of the process lifetime, so the registry is a write-rarely,
//! read-concurrently map.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::adapter::descriptor::{AdapterDescriptor, SearchAdapter};
use crate::backend::SearchBackend;
use crate::error::{Result, TrawlerError};

struct RegistryEntry {
    descriptor: Arc<AdapterDescriptor>,
    adapter: Arc<dyn Any + Send + Sync>,
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<TypeId, RegistryEntry>> = RwLock::new(HashMap::new());
}

/// Register the adapter for entity type `T`.
///
/// Fails with [`TrawlerError::DuplicateAdapter`] when `T` is already
/// registered; double registration at startup is a bug worth surfacing.
pub fn register<T: 'static>(adapter: SearchAdapter<T>) -> Result<()> {
    let mut registry = REGISTRY.write();
    let key = TypeId::of::<T>();
    if registry.contains_key(&key) {
        return Err(TrawlerError::duplicate_adapter(type_name::<T>()));
    }
    let descriptor = adapter.descriptor().clone();
    registry.insert(
        key,
        RegistryEntry {
            descriptor,
            adapter: Arc::new(adapter),
        },
    );
    Ok(())
}

/// Look up the descriptor registered for entity type `T`.
pub fn descriptor_of<T: 'static>() -> Result<Arc<AdapterDescriptor>> {
    let registry = REGISTRY.read();
    registry
        .get(&TypeId::of::<T>())
        .map(|entry| entry.descriptor.clone())
        .ok_or_else(|| TrawlerError::unknown_adapter(type_name::<T>()))
}

/// Look up the full adapter registered for entity type `T`.
pub fn adapter_of<T: 'static>() -> Result<Arc<SearchAdapter<T>>> {
    let registry = REGISTRY.read();
    let entry = registry
        .get(&TypeId::of::<T>())
        .ok_or_else(|| TrawlerError::unknown_adapter(type_name::<T>()))?;
    entry
        .adapter
        .clone()
        .downcast::<SearchAdapter<T>>()
        .map_err(|_| TrawlerError::unknown_adapter(type_name::<T>()))
}

/// Every registered descriptor, for startup enumeration.
pub fn descriptors() -> Vec<Arc<AdapterDescriptor>> {
    let registry = REGISTRY.read();
    registry
        .values()
        .map(|entry| entry.descriptor.clone())
        .collect()
}

/// Push every registered mapping to the engine.
///
/// Intended to run once at startup, after all adapters are registered.
pub fn sync_mappings(backend: &dyn SearchBackend) -> Result<()> {
    for descriptor in descriptors() {
        if descriptor.mapping.is_null() {
            continue;
        }
        backend.put_mapping(&descriptor.doc_type, &descriptor.mapping)?;
    }
    Ok(())
}
