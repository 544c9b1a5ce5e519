use crate::ParseError;

/// Return the slice of `doc` from the first `open_marker` through the end of
/// the first `close_marker` that follows it.
///
/// Only positions are used: an `open_marker` repeated before the close does
/// not need a matching close of its own.
pub fn extract_between<'a>(
    doc: &'a str,
    open_marker: &str,
    close_marker: &str,
) -> Result<&'a str, ParseError> {
    if open_marker.is_empty() || close_marker.is_empty() {
        return Err(ParseError::EmptyMarker);
    }
    let start = doc
        .find(open_marker)
        .ok_or_else(|| ParseError::MissingOpenMarker {
            marker: open_marker.to_string(),
        })?;
    let close_rel = doc[start..]
        .find(close_marker)
        .ok_or_else(|| ParseError::MissingCloseMarker {
            marker: close_marker.to_string(),
            after: start,
        })?;
    let end = start + close_rel + close_marker.len();
    Ok(&doc[start..end])
}
