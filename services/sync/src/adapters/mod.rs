pub mod auth;
pub mod memory;
pub mod store;

pub use auth::HostedAuthAdapter;
pub use memory::{MemoryAuth, MemoryStore};
pub use store::RestDocumentStore;
