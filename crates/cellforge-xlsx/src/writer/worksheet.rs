//! Worksheet part (`xl/worksheets/sheetN.xml`)

use std::collections::{BTreeMap, BTreeSet};

use cellforge_core::{CellData, CellReference, CellValue, Image, Worksheet, MAX_COLS, MAX_ROWS};
use cellforge_formula::Evaluator;

use super::WriterOptions;
use crate::shared_strings::SharedStringPool;
use crate::styles::StyleTable;
use crate::xml::{escape_cell_text, escape_xml};

/// A rendered worksheet plus what its relationships part must point at
pub(super) struct SheetPart<'a> {
    pub xml: String,
    /// Hyperlink targets, `rId1..` in this order
    pub hyperlinks: Vec<String>,
    /// Pictures for the sheet's drawing, if any
    pub images: Vec<&'a Image>,
}

impl SheetPart<'_> {
    /// Relationship id of the drawing (follows the hyperlinks)
    pub fn drawing_rel_id(&self) -> String {
        format!("rId{}", self.hyperlinks.len() + 1)
    }

    pub fn has_relationships(&self) -> bool {
        !self.hyperlinks.is_empty() || !self.images.is_empty()
    }
}

/// Render one worksheet, registering its styles and strings
pub(super) fn render_worksheet<'a>(
    sheet: &'a Worksheet,
    styles: &mut StyleTable,
    strings: &mut SharedStringPool,
    options: &WriterOptions,
) -> SheetPart<'a> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );

    if let Some(range) = sheet.used_range() {
        xml.push_str(&format!("\n  <dimension ref=\"{}\"/>", range));
    }

    // Column widths
    let widths = sheet.custom_column_widths();
    if !widths.is_empty() {
        xml.push_str("\n  <cols>");
        for (min, max, width) in column_spans(widths) {
            xml.push_str(&format!(
                "\n    <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                min, max, width
            ));
        }
        xml.push_str("\n  </cols>");
    }

    // Sheet data
    let evaluator = Evaluator::new(sheet);
    let rows: BTreeSet<u32> = sheet
        .used_rows()
        .into_iter()
        .chain(sheet.custom_row_heights().range(1..=MAX_ROWS).map(|(&row, _)| row))
        .collect();

    if rows.is_empty() {
        xml.push_str("\n  <sheetData/>");
    } else {
        xml.push_str("\n  <sheetData>");
        for row in rows {
            xml.push_str(&format!("\n    <row r=\"{}\"", row));
            if let Some(height) = sheet.custom_row_heights().get(&row) {
                xml.push_str(&format!(" ht=\"{}\" customHeight=\"1\"", height));
            }
            xml.push('>');
            for (col, data) in sheet.row_cells(row) {
                let cell = CellReference::new(row, col);
                write_cell(&mut xml, cell, data, styles, strings, &evaluator, options);
            }
            xml.push_str("</row>");
        }
        xml.push_str("\n  </sheetData>");
    }

    // Merged cells
    let merged = sheet.merged_regions();
    if !merged.is_empty() {
        xml.push_str(&format!("\n  <mergeCells count=\"{}\">", merged.len()));
        for range in merged {
            xml.push_str(&format!("\n    <mergeCell ref=\"{}\"/>", range));
        }
        xml.push_str("\n  </mergeCells>");
    }

    // Hyperlinks
    let mut hyperlinks = Vec::new();
    let links: Vec<_> = sheet.hyperlinks().collect();
    if !links.is_empty() {
        xml.push_str("\n  <hyperlinks>");
        for (cell, url) in links {
            hyperlinks.push(url.to_string());
            xml.push_str(&format!(
                "\n    <hyperlink ref=\"{}\" r:id=\"rId{}\"/>",
                cell,
                hyperlinks.len()
            ));
        }
        xml.push_str("\n  </hyperlinks>");
    }

    let mut part = SheetPart {
        xml: String::new(),
        hyperlinks,
        images: sheet.images().iter().collect(),
    };

    if !part.images.is_empty() {
        xml.push_str(&format!("\n  <drawing r:id=\"{}\"/>", part.drawing_rel_id()));
    }

    xml.push_str("\n</worksheet>");
    part.xml = xml;
    part
}

fn write_cell(
    xml: &mut String,
    cell: CellReference,
    data: &CellData,
    styles: &mut StyleTable,
    strings: &mut SharedStringPool,
    evaluator: &Evaluator<'_, Worksheet>,
    options: &WriterOptions,
) {
    let style_attr = match &data.style {
        Some(style) if !style.is_default() => format!(" s=\"{}\"", styles.register_style(style)),
        _ => String::new(),
    };
    let open = |t: Option<&str>| match t {
        Some(t) => format!("<c r=\"{}\"{} t=\"{}\">", cell, style_attr, t),
        None => format!("<c r=\"{}\"{}>", cell, style_attr),
    };

    match &data.value {
        CellValue::Empty => {
            if !style_attr.is_empty() {
                xml.push_str(&format!("<c r=\"{}\"{}/>", cell, style_attr));
            }
        }
        CellValue::Text(s) => {
            let idx = strings.add(s);
            xml.push_str(&open(Some("s")));
            xml.push_str(&format!("<v>{}</v></c>", idx));
        }
        CellValue::Formula { text, cached } => {
            let formula = escape_cell_text(text.strip_prefix('=').unwrap_or(text));
            let value = match cached.as_deref() {
                Some(CellValue::Formula { .. }) | None => {
                    if options.compute_missing_cached_values {
                        Some(evaluator.cached_result(cell))
                    } else {
                        None
                    }
                }
                Some(value) => Some(value.clone()),
            };

            match value.as_ref().map(scalar_value) {
                Some((t, v)) => {
                    // Text results are written inline rather than shared
                    let t = if t == Some("s") { Some("str") } else { t };
                    xml.push_str(&open(t));
                    xml.push_str(&format!("<f>{}</f><v>{}</v></c>", formula, v));
                }
                None => {
                    xml.push_str(&open(None));
                    xml.push_str(&format!("<f>{}</f></c>", formula));
                }
            }
        }
        other => {
            let (t, v) = scalar_value(other);
            xml.push_str(&open(t));
            xml.push_str(&format!("<v>{}</v></c>", v));
        }
    }
}

/// Cell type code and `<v>` text of a non-formula value
///
/// Text is reported as `s` with its escaped content; callers decide between
/// a shared string and an inline one.
fn scalar_value(value: &CellValue) -> (Option<&'static str>, String) {
    match value {
        CellValue::Number(n) if n.is_finite() => (None, format!("{}", n)),
        CellValue::Number(_) => (Some("e"), "#NUM!".to_string()),
        CellValue::Boolean(b) => (Some("b"), if *b { "1" } else { "0" }.to_string()),
        CellValue::Error(e) => (Some("e"), escape_xml(e.as_str())),
        CellValue::Text(s) => (Some("s"), escape_cell_text(s)),
        CellValue::Empty => (Some("s"), String::new()),
        CellValue::Formula { cached, .. } => cached
            .as_deref()
            .map(scalar_value)
            .unwrap_or((Some("s"), String::new())),
    }
}

/// Collapses adjacent columns of equal width into `(min, max, width)` spans
fn column_spans(widths: &BTreeMap<u32, f64>) -> Vec<(u32, u32, f64)> {
    let mut spans: Vec<(u32, u32, f64)> = Vec::new();
    for (&col, &width) in widths.range(1..=MAX_COLS) {
        match spans.last_mut() {
            Some((_, max, w)) if *max + 1 == col && *w == width => *max = col,
            _ => spans.push((col, col, width)),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_core::{CellError, Style};

    fn render(sheet: &Worksheet, options: &WriterOptions) -> (String, SharedStringPool, StyleTable) {
        let mut styles = StyleTable::new();
        let mut strings = SharedStringPool::new();
        let xml = render_worksheet(sheet, &mut styles, &mut strings, options).xml;
        (xml, strings, styles)
    }

    #[test]
    fn test_cell_types() {
        let mut sheet = Worksheet::new("Data");
        sheet.set_cell_value("A1", 1.5).unwrap();
        sheet.set_cell_value("B1", "Total").unwrap();
        sheet.set_cell_value("C1", true).unwrap();
        sheet.set_cell_value("D1", CellError::Na).unwrap();
        sheet.set_cell_value("A2", "Total").unwrap();

        let (xml, strings, _) = render(&sheet, &WriterOptions::default());
        assert!(xml.contains("<dimension ref=\"A1:D2\"/>"));
        assert!(xml.contains("<c r=\"A1\"><v>1.5</v></c>"));
        assert!(xml.contains("<c r=\"B1\" t=\"s\"><v>0</v></c>"));
        assert!(xml.contains("<c r=\"C1\" t=\"b\"><v>1</v></c>"));
        assert!(xml.contains("<c r=\"D1\" t=\"e\"><v>#N/A</v></c>"));
        assert!(xml.contains("<c r=\"A2\" t=\"s\"><v>0</v></c>"));
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn test_formula_fallback() {
        let mut sheet = Worksheet::new("Calc");
        sheet.set_cell_value("A1", 2.0).unwrap();
        sheet.set_cell_formula("B1", "=A1*21").unwrap();
        sheet.set_cell_formula("C1", "=1/0").unwrap();
        sheet
            .set_cell_value("D1", CellValue::formula_with_cached("=A1&\"x\"", "2x".into()))
            .unwrap();
        sheet.set_cell_formula("E1", "=MYSTERY()").unwrap();

        let (xml, strings, _) = render(&sheet, &WriterOptions::default());
        assert!(xml.contains("<c r=\"B1\"><f>A1*21</f><v>42</v></c>"));
        assert!(xml.contains("<c r=\"C1\" t=\"e\"><f>1/0</f><v>#DIV/0!</v></c>"));
        assert!(xml.contains("<c r=\"D1\" t=\"str\"><f>A1&amp;&quot;x&quot;</f><v>2x</v></c>"));
        assert!(xml.contains("<c r=\"E1\" t=\"e\"><f>MYSTERY()</f><v>#NAME?</v></c>"));
        assert!(strings.is_empty());

        let lazy = WriterOptions::default().with_compute_missing_cached_values(false);
        let (xml, _, _) = render(&sheet, &lazy);
        assert!(xml.contains("<c r=\"B1\"><f>A1*21</f></c>"));
    }

    #[test]
    fn test_layout_and_links() {
        let mut sheet = Worksheet::new("Layout");
        sheet.set_cell_value("A1", "Docs").unwrap();
        sheet.set_hyperlink("A1", "https://example.com/?a=1&b=2").unwrap();
        sheet.set_cell_style("B2", &Style::new().bold(true)).unwrap();
        sheet.merge_cells("A3:C3").unwrap();
        sheet.set_column_width(2, 20.5);
        sheet.set_row_height(5, 30.0);

        let mut styles = StyleTable::new();
        let mut strings = SharedStringPool::new();
        let part = render_worksheet(&sheet, &mut styles, &mut strings, &WriterOptions::default());

        assert!(part.xml.contains("<col min=\"2\" max=\"2\" width=\"20.5\" customWidth=\"1\"/>"));
        assert!(part.xml.contains("<c r=\"B2\" s=\"1\"/>"));
        assert!(part.xml.contains("<row r=\"5\" ht=\"30\" customHeight=\"1\"></row>"));
        assert!(part.xml.contains("<mergeCell ref=\"A3:C3\"/>"));
        assert!(part.xml.contains("<hyperlink ref=\"A1\" r:id=\"rId1\"/>"));
        assert_eq!(part.hyperlinks, vec!["https://example.com/?a=1&b=2"]);
        assert!(part.has_relationships());
        assert!(!part.xml.contains("<drawing"));
        assert_eq!(styles.cell_format_count(), 2);
    }

    #[test]
    fn test_column_widths_collapse_into_spans() {
        let mut sheet = Worksheet::new("Cols");
        for col in 5..=16_384 {
            sheet.set_column_width(col, 12.0);
        }
        sheet.set_column_width(1, 9.0);
        sheet.set_column_width(2, 9.0);
        sheet.set_column_width(3, 10.0);
        sheet.set_column_width(0, 50.0);
        sheet.set_row_height(0, 40.0);

        let (xml, _, _) = render(&sheet, &WriterOptions::default());
        let cols: Vec<&str> = xml.matches("<col ").collect();
        assert_eq!(cols.len(), 3);
        assert!(xml.contains("<col min=\"1\" max=\"2\" width=\"9\" customWidth=\"1\"/>"));
        assert!(xml.contains("<col min=\"3\" max=\"3\" width=\"10\" customWidth=\"1\"/>"));
        assert!(xml.contains("<col min=\"5\" max=\"16384\" width=\"12\" customWidth=\"1\"/>"));
        assert!(!xml.contains("r=\"0\""));
        assert!(xml.contains("<sheetData/>"));
    }
}
