//! Backend contract for the discover service registry client.
//!
//! The registry itself (the durable store holding registrations and
//! notifying of changes) lives outside this workspace. This crate pins down
//! what the client core needs from it:
//!
//! - [`RegistryBackend`]: put / renew / delete / list / promote / watch
//! - [`RegistrationRecord`]: one registration as the backend reports it
//! - [`BackendError`]: the failure kinds a backend may surface
//!
//! [`InMemoryBackend`] implements the contract over a local map. It backs
//! tests and single-process embedding, and doubles as the reference for how
//! a real backend is expected to behave.

mod error;
pub mod inmemory;
mod traits;
mod types;
pub mod validation;

pub use error::BackendError;
pub use inmemory::InMemoryBackend;
pub use traits::RegistryBackend;
pub use types::Attributes;
pub use types::LeaseGrant;
pub use types::LeaseToken;
pub use types::RecordState;
pub use types::RegistrationMode;
pub use types::RegistrationRecord;
pub use types::ServiceIdentity;
