//! CountryFX Common Types
//!
//! This crate contains the types shared across the CountryFX workspace:
//! identifiers, the persisted country record, the refresh state singleton,
//! the error taxonomy and time helpers.

pub mod identifiers;
pub mod country;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use country::*;
pub use error::*;
pub use time::*;
