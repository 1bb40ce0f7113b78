pub mod document;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use document::{DocKey, Document};
pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use schema::{FieldDef, FieldType, Schema, SchemaRegistry, ID_FIELD};
pub use store::{DocumentStore, StoreError};
