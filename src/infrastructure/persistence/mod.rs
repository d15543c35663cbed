//! Model store adapters.
//!
//! Both adapters hold the snapshot in its serialized JSON form, so what comes back
//! from `load` is always a fresh deserialization, never a shared in-memory object.

mod in_memory;
mod json_model_store;

pub use in_memory::InMemoryModelStore;
pub use json_model_store::JsonFileModelStore;
