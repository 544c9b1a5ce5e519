use relay_core::{
    extract_between, extract_headers, extract_rows, extract_table, ExtractionSettings, ParseError,
    RowWidth,
};
use pretty_assertions::assert_eq;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn page(table: &str) -> String {
    format!(
        "<html><body><h1>Title</h1><div class=\"table-wrap\">{table}</div><div>footer</div></body></html>"
    )
}

#[test]
fn end_to_end_fragment_yields_headers_and_rows() {
    let fragment = "<table><tr><th>Name</th><th>Val</th></tr><tr><td>a</td><td>1</td></tr></table>";
    let headers = extract_headers(fragment).unwrap();
    let table = extract_rows(fragment, RowWidth::default()).unwrap();

    assert_eq!(headers.labels(), &strings(&["Name", "Val"])[..]);
    assert_eq!(table.to_values(), vec![strings(&["a", "1"])]);
}

#[test]
fn header_count_matches_cells_in_document_order() {
    let fragment = "<tr><th class=\"c\">One</th><th>Two</th><th>One</th><th>Four</th></tr>";
    let headers = extract_headers(fragment).unwrap();
    assert_eq!(headers.into_labels(), strings(&["One", "Two", "One", "Four"]));
}

#[test]
fn even_cells_make_full_rows_and_odd_tail_is_dropped() {
    let even = "<td>a</td><td>1</td><td>b</td><td>2</td><td>c</td><td>3</td>";
    let table = extract_rows(even, RowWidth::default()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.dropped_cells(), 0);

    let odd = format!("{even}<td>orphan</td>");
    let table = extract_rows(&odd, RowWidth::default()).unwrap();
    assert_eq!(
        table.to_values(),
        vec![
            strings(&["a", "1"]),
            strings(&["b", "2"]),
            strings(&["c", "3"])
        ]
    );
    assert_eq!(table.dropped_cells(), 1);
}

#[test]
fn nested_markup_never_reaches_cell_text() {
    let fragment =
        "<td class=\"confluenceTd\"><p><strong>Moscow</strong></p></td><td><em>12</em>&nbsp;500</td>";
    let table = extract_rows(fragment, RowWidth::default()).unwrap();
    assert_eq!(table.to_values(), vec![strings(&["Moscow", "12 500"])]);
}

#[test]
fn named_character_references_are_decoded() {
    let fragment = "<td>a&mdash;b</td><td>&laquo;x&raquo; &hellip; &ndash; &copy;</td>";
    let table = extract_rows(fragment, RowWidth::default()).unwrap();
    assert_eq!(
        table.to_values(),
        vec![strings(&["a\u{2014}b", "\u{ab}x\u{bb} \u{2026} \u{2013} \u{a9}"])]
    );
}

#[test]
fn missing_container_is_a_parse_error() {
    let err = extract_between("<html><table></table></html>", "<div class=\"table-wrap\">", "</div>")
        .unwrap_err();
    assert!(matches!(err, ParseError::MissingOpenMarker { .. }));

    let err = extract_table("<p>nothing here</p>", &ExtractionSettings::default()).unwrap_err();
    assert!(matches!(err, ParseError::MissingOpenMarker { .. }));
}

#[test]
fn empty_container_yields_empty_headers_and_table() {
    let extracted = extract_table(&page("<table></table>"), &ExtractionSettings::default()).unwrap();
    assert!(extracted.headers.is_empty());
    assert!(extracted.table.is_empty());
}

#[test]
fn unclosed_data_cell_is_reported_without_rows() {
    let fragment = "<table>\n<tr><td>a</td><td>1</td></tr>\n<tr><td>b";
    let err = extract_rows(fragment, RowWidth::default()).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnclosedCell {
            tag: "td".to_string(),
            line: 3
        }
    );
}

#[test]
fn full_page_extraction_stops_at_first_close_marker() {
    let html = page(
        "<table><tbody><tr><th>City</th><th>Code</th></tr>\
         <tr><td>Moscow</td><td>495</td></tr>\
         <tr><td>Saint Petersburg</td><td>812</td></tr></tbody></table>",
    );
    let extracted = extract_table(&html, &ExtractionSettings::default()).unwrap();
    assert_eq!(extracted.headers.labels(), &strings(&["City", "Code"])[..]);
    assert_eq!(
        extracted.table.to_values(),
        vec![strings(&["Moscow", "495"]), strings(&["Saint Petersburg", "812"])]
    );
}

#[test]
fn header_width_must_match_row_width() {
    let html = page("<table><tr><th>A</th><th>B</th><th>C</th></tr><tr><td>1</td><td>2</td></tr></table>");
    let err = extract_table(&html, &ExtractionSettings::default()).unwrap_err();
    assert_eq!(
        err,
        ParseError::ColumnCountMismatch {
            expected: 2,
            found: 3
        }
    );

    let settings = ExtractionSettings {
        row_width: RowWidth::new(3).unwrap(),
        ..ExtractionSettings::default()
    };
    let extracted = extract_table(&html, &settings).unwrap();
    assert_eq!(extracted.headers.len(), 3);
    assert!(extracted.table.is_empty());
    assert_eq!(extracted.table.dropped_cells(), 2);
}
