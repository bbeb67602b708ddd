//! CountryFX Store
//!
//! The persisted country collection and the refresh-state singleton, keyed
//! physically by surrogate id and logically by case-folded name.

pub mod error;
pub mod store;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use store::{CountryStore, SharedStore};
pub use memory::InMemoryCountryStore;
pub use postgres::PgCountryStore;
