//! Relay core: table extraction and the pure sync-driver state machine.
mod cells;
mod effect;
mod error;
mod extract;
mod markers;
mod msg;
mod state;
mod table;
mod update;

pub use effect::Effect;
pub use error::ParseError;
pub use extract::{extract_headers, extract_rows, extract_table};
pub use markers::extract_between;
pub use msg::Msg;
pub use state::{CycleSummary, DriverState, Phase, SyncStep, DEFAULT_INTERVAL};
pub use table::{DataRow, ExtractedTable, ExtractionSettings, HeaderRow, RowWidth, Table};
pub use update::update;
