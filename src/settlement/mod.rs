//! Batch Settlement Processor
//!
//! Applies admin-uploaded trading results to every active position of the
//! named strategies.

pub mod processor;
pub mod tabular;

pub use processor::{SettlementFailure, SettlementProcessor, SettlementReport};
pub use tabular::{CsvTabularParser, SettlementRow, TabularFormat, TabularParser};
