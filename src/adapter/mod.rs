//! Per-entity search adapters and the process-wide registry.

pub mod descriptor;
pub mod registry;

pub use self::descriptor::{AdapterDescriptor, MatchType, SearchAdapter, SearchField, Sort};
pub use self::registry::{adapter_of, descriptor_of, descriptors, register, sync_mappings};
