pub mod persistence;

pub use persistence::{InMemoryModelStore, JsonFileModelStore};
