//! Crowdsale simulation primitives.
//! Stable, behavior-free value types shared by every crate in the workspace.
//!
//! Rule: contracts are identified by 20-byte addresses, never by names.

pub mod errors;
pub mod primitives;

pub use errors::{ParseError, ParseResult};
pub use primitives::{Address, Amount, Timestamp, TxHash, PRECISION, USD_PRECISION};
