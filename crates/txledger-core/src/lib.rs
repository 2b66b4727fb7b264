//! # txledger-core
//! Data model, error taxonomy and trait seams for the txledger engine.

pub mod constants;
pub mod error;
pub mod pending;
pub mod traits;
pub mod types;
pub mod validation;
