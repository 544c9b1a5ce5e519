use std::time::Duration;

use crate::{HeaderRow, ParseError, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchDocument,
    PublishHeaders(HeaderRow),
    PublishBody(Table),
    /// Cycle finished; wait before starting the next one.
    Sleep(Duration),
    /// The fetched page did not contain a usable table.
    RejectDocument(ParseError),
}
