//! FxRate Common Types
//!
//! Shared types used by the rate cache and the validation engine: currencies,
//! currency pairs, rate records and their invariants, and time helpers.

pub mod currency;
pub mod rate;
pub mod error;
pub mod time;

pub use currency::*;
pub use rate::*;
pub use error::*;
pub use time::*;
