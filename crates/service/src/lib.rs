pub mod errors;
pub mod keys;
pub mod runtime;
pub mod schema;
pub mod storage;

pub use storage::DocumentStore;
