//! Observation retrieval from the eBird API and decoding of its hotspot CSV.

pub mod client;
pub mod decode;
pub mod error;

pub use client::EbirdClient;
pub use decode::{decode, decode_rows, RowOutcome, RowRejection};
pub use error::EbirdError;
