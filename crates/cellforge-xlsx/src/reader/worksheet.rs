//! Worksheet part parsing

use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::styles::attr;
use crate::xml::decode_excel_escapes;
use cellforge_core::{
    CellError, CellRange, CellReference, CellValue, Style, Worksheet, MAX_COLS, MAX_ROWS,
};

/// A `<hyperlink>` before its relationship is resolved
#[derive(Debug, Clone, PartialEq)]
pub(super) struct PendingHyperlink {
    pub cell: String,
    pub rel_id: Option<String>,
}

/// Parts of a worksheet that point into its relationships
#[derive(Debug, Default)]
pub(super) struct SheetLinks {
    pub hyperlinks: Vec<PendingHyperlink>,
    pub drawing: Option<String>,
}

/// Attributes and content of the `<c>` being parsed
#[derive(Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
    inline: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    Value,
    Formula,
    Inline,
}

/// Parse a worksheet part into `sheet`
///
/// Cells with a malformed reference are skipped with a warning; everything
/// else in the sheet is still read.
pub(super) fn read_worksheet<R: Read>(
    reader: R,
    sheet: &mut Worksheet,
    shared_strings: &[String],
    styles: &[Style],
) -> XlsxResult<SheetLinks> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));

    let mut buf = Vec::new();
    let mut links = SheetLinks::default();
    let mut cell: Option<PendingCell> = None;
    let mut target = TextTarget::None;
    let mut in_inline_string = false;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => read_row(&e, sheet),
                b"c" => cell = Some(start_cell(&e)),
                b"v" if cell.is_some() => target = TextTarget::Value,
                b"f" if cell.is_some() => target = TextTarget::Formula,
                b"is" if cell.is_some() => in_inline_string = true,
                b"t" if in_inline_string => target = TextTarget::Inline,
                b"hyperlink" => read_hyperlink(&e, &mut links),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"row" => read_row(&e, sheet),
                b"c" => process_cell(start_cell(&e), sheet, shared_strings, styles),
                b"f" => log::debug!("skipping formula without text (shared formula reference)"),
                b"col" => read_col(&e, sheet),
                b"mergeCell" => read_merge(&e, sheet),
                b"hyperlink" => read_hyperlink(&e, &mut links),
                b"drawing" => links.drawing = rel_id(&e),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(pending) = cell.as_mut() {
                    let slot = match target {
                        TextTarget::Value => Some(&mut pending.value),
                        TextTarget::Formula => Some(&mut pending.formula),
                        TextTarget::Inline => Some(&mut pending.inline),
                        TextTarget::None => None,
                    };
                    if let Some(slot) = slot {
                        slot.get_or_insert_with(String::new).push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"v" | b"f" | b"t" => target = TextTarget::None,
                b"is" => in_inline_string = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        process_cell(pending, sheet, shared_strings, styles);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(links)
}

fn start_cell(e: &BytesStart<'_>) -> PendingCell {
    PendingCell {
        reference: attr(e, b"r"),
        cell_type: attr(e, b"t"),
        style: attr(e, b"s").and_then(|s| s.parse().ok()),
        ..PendingCell::default()
    }
}

fn read_row(e: &BytesStart<'_>, sheet: &mut Worksheet) {
    let row: Option<u32> = attr(e, b"r").and_then(|v| v.parse().ok());
    let height: Option<f64> = attr(e, b"ht").and_then(|v| v.parse().ok());
    let custom = attr(e, b"customHeight").map_or(false, |v| v == "1" || v == "true");
    if let (Some(row), Some(height), true) = (row, height, custom) {
        if (1..=MAX_ROWS).contains(&row) {
            sheet.set_row_height(row, height);
        } else {
            log::warn!("skipping height of out-of-range row {}", row);
        }
    }
}

fn read_col(e: &BytesStart<'_>, sheet: &mut Worksheet) {
    let min: Option<u32> = attr(e, b"min").and_then(|v| v.parse().ok());
    let max: Option<u32> = attr(e, b"max").and_then(|v| v.parse().ok());
    let width: Option<f64> = attr(e, b"width").and_then(|v| v.parse().ok());
    let custom = attr(e, b"customWidth").map_or(false, |v| v == "1" || v == "true");
    if let (Some(min), Some(max), Some(width), true) = (min, max, width, custom) {
        for col in min.max(1)..=max.min(MAX_COLS) {
            sheet.set_column_width(col, width);
        }
    }
}

fn read_merge(e: &BytesStart<'_>, sheet: &mut Worksheet) {
    let Some(reference) = attr(e, b"ref") else {
        return;
    };
    let merged = CellRange::parse(&reference).and_then(|range| sheet.merge_range(range));
    if let Err(err) = merged {
        log::warn!("skipping merged region {}: {}", reference, err);
    }
}

fn read_hyperlink(e: &BytesStart<'_>, links: &mut SheetLinks) {
    if let Some(cell) = attr(e, b"ref") {
        links.hyperlinks.push(PendingHyperlink {
            cell,
            rel_id: rel_id(e),
        });
    }
}

/// `r:id` under whatever prefix the part binds the relationships namespace to
fn rel_id(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn process_cell(cell: PendingCell, sheet: &mut Worksheet, shared_strings: &[String], styles: &[Style]) {
    let Some(reference) = cell.reference.as_deref() else {
        log::warn!("skipping cell without a reference");
        return;
    };
    let address = match CellReference::parse(reference) {
        Ok(address) => address,
        Err(err) => {
            log::warn!("skipping cell {:?}: {}", reference, err);
            return;
        }
    };

    let cell_type = cell.cell_type.as_deref();
    let raw = cell.inline.as_deref().or(cell.value.as_deref());
    let value = match (&cell.formula, raw) {
        (Some(formula), raw) => {
            let cached = raw.and_then(|v| typed_value(cell_type, v, shared_strings));
            let text = decode_excel_escapes(formula);
            Some(match cached {
                Some(cached) => CellValue::formula_with_cached(text, cached),
                None => CellValue::formula(text),
            })
        }
        (None, Some(raw)) => typed_value(cell_type, raw, shared_strings),
        (None, None) => None,
    };

    if let Some(value) = value {
        if let Err(err) = sheet.set_cell_value_at(address.row, address.col, value) {
            log::warn!("skipping cell {}: {}", reference, err);
            return;
        }
    }

    match cell.style {
        Some(0) | None => {}
        Some(idx) => match styles.get(idx as usize) {
            Some(style) => {
                if let Err(err) = sheet.set_cell_style_at(address.row, address.col, style) {
                    log::warn!("skipping style of {}: {}", reference, err);
                }
            }
            None if styles.is_empty() => {}
            None => log::warn!("cell {} uses unknown style index {}", reference, idx),
        },
    }
}

/// Decode `<v>` (or inline text) according to the cell's `t` attribute
fn typed_value(cell_type: Option<&str>, raw: &str, shared_strings: &[String]) -> Option<CellValue> {
    let value = match cell_type {
        Some("s") => {
            let text = raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx));
            match text {
                Some(text) => CellValue::Text(text.clone()),
                None => {
                    log::warn!("shared string index {:?} out of range", raw);
                    return None;
                }
            }
        }
        Some("b") => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
        Some("e") => CellError::from_str(raw)
            .map(CellValue::Error)
            .unwrap_or_else(|| CellValue::Text(raw.to_string())),
        Some("str") | Some("inlineStr") => CellValue::Text(decode_excel_escapes(raw).into_owned()),
        None | Some("n") => match raw.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(raw.to_string()),
        },
        Some(other) => {
            log::debug!("unknown cell type {:?}, reading as text", other);
            CellValue::Text(raw.to_string())
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read(xml: &str, strings: &[&str]) -> (Worksheet, SheetLinks) {
        let strings: Vec<String> = strings.iter().map(|s| s.to_string()).collect();
        let mut sheet = Worksheet::new("Sheet1");
        let links = read_worksheet(xml.as_bytes(), &mut sheet, &strings, &[]).unwrap();
        (sheet, links)
    }

    #[test]
    fn test_cell_types() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
          <sheetData>
            <row r="1">
              <c r="A1" t="s"><v>1</v></c>
              <c r="B1"><v>2.5</v></c>
              <c r="C1" t="b"><v>1</v></c>
              <c r="D1" t="e"><v>#DIV/0!</v></c>
              <c r="E1" t="inlineStr"><is><t xml:space="preserve"> in line </t></is></c>
              <c r="F1" t="str"><v>a_x000D_b</v></c>
            </row>
          </sheetData>
        </worksheet>"#;
        let (sheet, _) = read(xml, &["zero", "one"]);
        assert_eq!(sheet.get_value("A1").unwrap(), &CellValue::Text("one".into()));
        assert_eq!(sheet.get_value("B1").unwrap(), &CellValue::Number(2.5));
        assert_eq!(sheet.get_value("C1").unwrap(), &CellValue::Boolean(true));
        assert_eq!(sheet.get_value("D1").unwrap(), &CellValue::Error(CellError::Div0));
        assert_eq!(sheet.get_value("E1").unwrap(), &CellValue::Text(" in line ".into()));
        assert_eq!(sheet.get_value("F1").unwrap(), &CellValue::Text("a\rb".into()));
    }

    #[test]
    fn test_formulas_keep_cached_values() {
        let xml = r#"<worksheet><sheetData><row r="2">
            <c r="A2"><f>SUM(1,2)</f><v>3</v></c>
            <c r="B2" t="str"><f>"a"&amp;"b"</f><v>ab</v></c>
            <c r="C2"><f>A2*2</f></c>
        </row></sheetData></worksheet>"#;
        let (sheet, _) = read(xml, &[]);
        assert_eq!(
            sheet.get_value("A2").unwrap(),
            &CellValue::formula_with_cached("=SUM(1,2)", CellValue::Number(3.0))
        );
        assert_eq!(
            sheet.get_value("B2").unwrap(),
            &CellValue::formula_with_cached("=\"a\"&\"b\"", CellValue::Text("ab".into()))
        );
        assert_eq!(sheet.get_value("C2").unwrap(), &CellValue::formula("=A2*2"));
    }

    #[test]
    fn test_malformed_reference_skips_only_that_cell() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="1A"><v>1</v></c>
            <c r="B1"><v>2</v></c>
            <c r="C1" t="s"><v>9</v></c>
        </row></sheetData></worksheet>"#;
        let (sheet, _) = read(xml, &[]);
        assert_eq!(sheet.cell_count(), 1);
        assert_eq!(sheet.get_value("B1").unwrap(), &CellValue::Number(2.0));
    }

    #[test]
    fn test_layout_and_links() {
        let xml = r#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
          <cols><col min="2" max="3" width="18.5" customWidth="1"/><col min="4" max="4" width="9"/></cols>
          <sheetData><row r="4" ht="32" customHeight="1"><c r="A4"><v>1</v></c></row></sheetData>
          <mergeCells count="2"><mergeCell ref="A1:B2"/><mergeCell ref="B2:C3"/></mergeCells>
          <hyperlinks><hyperlink ref="A4" r:id="rId1"/><hyperlink ref="B4" location="Sheet2!A1"/></hyperlinks>
          <drawing r:id="rId2"/>
        </worksheet>"#;
        let (sheet, links) = read(xml, &[]);
        assert_eq!(sheet.column_width(2), 18.5);
        assert_eq!(sheet.column_width(3), 18.5);
        assert_eq!(sheet.column_width(4), Worksheet::DEFAULT_COLUMN_WIDTH);
        assert_eq!(sheet.row_height(4), 32.0);
        // The overlapping second region is dropped
        assert_eq!(sheet.merged_regions().len(), 1);
        assert_eq!(
            links.hyperlinks,
            vec![
                PendingHyperlink {
                    cell: "A4".into(),
                    rel_id: Some("rId1".into()),
                },
                PendingHyperlink {
                    cell: "B4".into(),
                    rel_id: None,
                },
            ]
        );
        assert_eq!(links.drawing.as_deref(), Some("rId2"));
    }

    #[test]
    fn test_out_of_range_rows_and_wide_spans() {
        let xml = r#"<worksheet>
          <cols><col min="5" max="16384" width="12" customWidth="1"/><col min="0" max="1" width="7" customWidth="1"/></cols>
          <sheetData>
            <row r="0" ht="40" customHeight="1"/>
            <row r="1048577" ht="40" customHeight="1"/>
            <row r="1048576" ht="25" customHeight="1"/>
          </sheetData>
        </worksheet>"#;
        let (sheet, _) = read(xml, &[]);
        assert_eq!(
            sheet.custom_row_heights().keys().copied().collect::<Vec<_>>(),
            vec![1_048_576]
        );
        assert_eq!(sheet.column_width(1), 7.0);
        assert_eq!(sheet.column_width(4), Worksheet::DEFAULT_COLUMN_WIDTH);
        assert_eq!(sheet.column_width(16_384), 12.0);
        assert!(!sheet.custom_column_widths().contains_key(&0));
    }
}
