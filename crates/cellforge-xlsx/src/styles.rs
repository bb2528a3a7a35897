//! XLSX styles (styles.xml) read/write helpers

use std::io::{BufReader, Read};

use ahash::AHashMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::escape_xml;
use cellforge_core::style::GENERAL_FORMAT;
use cellforge_core::{Border, BorderEdge, BorderLineStyle, Color, Fill, Font, PatternType, Style};

/// Number formats with fixed built-in IDs
const BUILTIN_NUMBER_FORMATS: &[(&str, u32)] = &[
    (GENERAL_FORMAT, 0),
    ("0", 1),
    ("0.00", 2),
    ("#,##0", 3),
    ("#,##0.00", 4),
    ("0%", 9),
    ("0.00%", 10),
    ("mm/dd/yyyy", 14),
];

/// First ID available to custom number formats
const FIRST_CUSTOM_NUMBER_FORMAT_ID: u32 = 164;

// === Writing ===

#[derive(Debug, Clone, PartialEq)]
struct FontEntry {
    name: String,
    size: f64,
    bold: bool,
    italic: bool,
    color: String,
}

impl FontEntry {
    fn from_font(font: &Font) -> Self {
        Self {
            name: font.name.clone(),
            size: font.size,
            bold: font.bold,
            italic: font.italic,
            color: font.color.to_rgb_hex(),
        }
    }

    fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.name, self.size, self.bold, self.italic, self.color
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FillEntry {
    pattern: PatternType,
    color: Option<String>,
}

impl FillEntry {
    fn from_fill(fill: &Fill) -> Self {
        Self {
            pattern: fill.pattern,
            color: fill.color.as_ref().map(Color::to_rgb_hex),
        }
    }

    fn key(&self) -> String {
        format!(
            "{}|{}",
            self.pattern.as_str(),
            self.color.as_deref().unwrap_or_default()
        )
    }
}

/// Line style and canonical color per edge, in left/right/top/bottom order
#[derive(Debug, Clone, PartialEq)]
struct BorderEntry {
    edges: [(BorderLineStyle, String); 4],
}

impl BorderEntry {
    fn from_border(border: &Border) -> Self {
        let edge = |e: Option<&BorderEdge>| match e {
            Some(e) if e.style != BorderLineStyle::None => (e.style, e.color.to_rgb_hex()),
            _ => (BorderLineStyle::None, String::new()),
        };
        let [l, r, t, b] = border.edges();
        Self {
            edges: [edge(l.1), edge(r.1), edge(t.1), edge(b.1)],
        }
    }

    fn key(&self) -> String {
        self.edges
            .iter()
            .map(|(style, color)| format!("{}:{}", style.as_str(), color))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// One `cellXfs` record: indices into the component tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellFormat {
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub number_format_id: u32,
}

/// Deduplicating tables of fonts, fills, borders, number formats and cell
/// formats, built fresh for each save
///
/// Colors are keyed by their canonical RGB form, so `"red"` and `"#FF0000"`
/// land on the same entry. Fill 0 is `none` and fill 1 is `gray125`; index 0
/// of every other table is the default.
#[derive(Debug)]
pub struct StyleTable {
    fonts: Vec<FontEntry>,
    font_ids: AHashMap<String, u32>,
    fills: Vec<FillEntry>,
    fill_ids: AHashMap<String, u32>,
    borders: Vec<BorderEntry>,
    border_ids: AHashMap<String, u32>,
    number_formats: Vec<(u32, String)>,
    number_format_ids: AHashMap<String, u32>,
    cell_formats: Vec<CellFormat>,
    cell_format_ids: AHashMap<CellFormat, u32>,
}

impl StyleTable {
    pub fn new() -> Self {
        let mut table = Self {
            fonts: Vec::new(),
            font_ids: AHashMap::new(),
            fills: Vec::new(),
            fill_ids: AHashMap::new(),
            borders: Vec::new(),
            border_ids: AHashMap::new(),
            number_formats: Vec::new(),
            number_format_ids: AHashMap::new(),
            cell_formats: Vec::new(),
            cell_format_ids: AHashMap::new(),
        };

        table.get_or_create_font_id(&Font::default());
        table.get_or_create_fill_id(&Fill::default());
        table.get_or_create_fill_id(&Fill {
            pattern: PatternType::Gray125,
            color: None,
        });
        table.get_or_create_border_id(&Border::default());
        table.get_or_create_cell_format_id(0, 0, 0, 0);
        table
    }

    pub fn get_or_create_font_id(&mut self, font: &Font) -> u32 {
        let entry = FontEntry::from_font(font);
        intern(&mut self.fonts, &mut self.font_ids, entry.key(), entry)
    }

    pub fn get_or_create_fill_id(&mut self, fill: &Fill) -> u32 {
        let entry = FillEntry::from_fill(fill);
        intern(&mut self.fills, &mut self.fill_ids, entry.key(), entry)
    }

    pub fn get_or_create_border_id(&mut self, border: &Border) -> u32 {
        let entry = BorderEntry::from_border(border);
        intern(&mut self.borders, &mut self.border_ids, entry.key(), entry)
    }

    /// Built-in codes map to their fixed IDs, custom codes count up from 164
    pub fn get_or_create_number_format_id(&mut self, code: &str) -> u32 {
        if let Some(&(_, id)) = BUILTIN_NUMBER_FORMATS.iter().find(|(c, _)| *c == code) {
            return id;
        }
        if let Some(&id) = self.number_format_ids.get(code) {
            return id;
        }
        let id = FIRST_CUSTOM_NUMBER_FORMAT_ID + self.number_formats.len() as u32;
        self.number_formats.push((id, code.to_string()));
        self.number_format_ids.insert(code.to_string(), id);
        id
    }

    pub fn get_or_create_cell_format_id(
        &mut self,
        font_id: u32,
        fill_id: u32,
        border_id: u32,
        number_format_id: u32,
    ) -> u32 {
        let format = CellFormat {
            font_id,
            fill_id,
            border_id,
            number_format_id,
        };
        if let Some(&id) = self.cell_format_ids.get(&format) {
            return id;
        }
        let id = self.cell_formats.len() as u32;
        self.cell_formats.push(format);
        self.cell_format_ids.insert(format, id);
        id
    }

    /// Register every component of `style` and return its cell format ID
    pub fn register_style(&mut self, style: &Style) -> u32 {
        let font_id = self.get_or_create_font_id(&style.font);
        let fill_id = if style.fill.is_none() {
            0
        } else {
            self.get_or_create_fill_id(&style.fill)
        };
        let border_id = self.get_or_create_border_id(&style.border);
        let number_format_id = self.get_or_create_number_format_id(&style.number_format);
        self.get_or_create_cell_format_id(font_id, fill_id, border_id, number_format_id)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    pub fn cell_format_count(&self) -> usize {
        self.cell_formats.len()
    }

    /// Custom number formats as (id, code)
    pub fn custom_number_formats(&self) -> &[(u32, String)] {
        &self.number_formats
    }

    /// Render `xl/styles.xml`
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !self.number_formats.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", self.number_formats.len()));
            for (id, code) in &self.number_formats {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        // Fonts
        xml.push_str(&format!("\n  <fonts count=\"{}\">", self.fonts.len()));
        for font in &self.fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        // Fills
        xml.push_str(&format!("\n  <fills count=\"{}\">", self.fills.len()));
        for fill in &self.fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill));
        }
        xml.push_str("\n  </fills>");

        // Borders
        xml.push_str(&format!("\n  <borders count=\"{}\">", self.borders.len()));
        for border in &self.borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        // cellStyleXfs (required)
        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.cell_formats.len()));
        for format in &self.cell_formats {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(format));
        }
        xml.push_str("\n  </cellXfs>");

        // cellStyles (required)
        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>"#,
        );

        xml.push_str("\n</styleSheet>");
        xml
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

fn intern<T>(items: &mut Vec<T>, ids: &mut AHashMap<String, u32>, key: String, item: T) -> u32 {
    if let Some(&id) = ids.get(&key) {
        return id;
    }
    let id = items.len() as u32;
    items.push(item);
    ids.insert(key, id);
    id
}

fn write_font(font: &FontEntry) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    // Black is the implicit default
    if font.color != "000000" {
        s.push_str(&format!("<color rgb=\"FF{}\"/>", font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &FillEntry) -> String {
    match (&fill.pattern, &fill.color) {
        (PatternType::None, _) => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        (pattern, Some(color)) => format!(
            "<fill><patternFill patternType=\"{}\"><fgColor rgb=\"FF{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
            pattern.as_str(),
            color
        ),
        (pattern, None) => format!(
            "<fill><patternFill patternType=\"{}\"/></fill>",
            pattern.as_str()
        ),
    }
}

fn write_border(border: &BorderEntry) -> String {
    let mut s = String::from("<border>");
    for (tag, (style, color)) in ["left", "right", "top", "bottom"].iter().zip(&border.edges) {
        if *style == BorderLineStyle::None {
            s.push_str(&format!("<{}/>", tag));
        } else {
            s.push_str(&format!(
                "<{tag} style=\"{}\"><color rgb=\"FF{}\"/></{tag}>",
                style.as_str(),
                color,
                tag = tag
            ));
        }
    }
    s.push_str("<diagonal/></border>");
    s
}

fn write_xf(format: &CellFormat) -> String {
    let mut attrs = String::new();
    if format.number_format_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if format.font_id != 0 {
        attrs.push_str(" applyFont=\"1\"");
    }
    if format.fill_id != 0 {
        attrs.push_str(" applyFill=\"1\"");
    }
    if format.border_id != 0 {
        attrs.push_str(" applyBorder=\"1\"");
    }
    format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}/>",
        format.number_format_id, format.font_id, format.fill_id, format.border_id, attrs
    )
}

// === Reading ===

/// Read `xl/styles.xml` into one [`Style`] per `cellXfs` entry
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();

    let mut number_formats: AHashMap<u32, String> = AHashMap::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Fill> = Vec::new();
    let mut borders: Vec<Border> = Vec::new();
    let mut cell_xfs: Vec<(u32, u32, u32, u32)> = Vec::new();

    let mut current_font: Option<Font> = None;
    let mut current_fill: Option<Fill> = None;
    let mut current_border: Option<Border> = None;
    let mut current_edge: Option<(&'static str, BorderEdge)> = None;
    let mut in_cell_xfs = false;

    loop {
        let event = xml_reader.read_event_into(&mut buf)?;
        let (e, is_empty) = match &event {
            Event::Start(e) => (Some(e.clone()), false),
            Event::Empty(e) => (Some(e.clone()), true),
            _ => (None, false),
        };

        if let Some(e) = e {
            match e.name().as_ref() {
                b"numFmt" => {
                    let id = attr(&e, b"numFmtId").and_then(|v| v.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")) {
                        number_formats.insert(id, code);
                    }
                }
                b"font" if !is_empty => current_font = Some(Font::default()),
                b"font" => fonts.push(Font::default()),
                b"b" => {
                    if let Some(font) = current_font.as_mut() {
                        font.bold = attr(&e, b"val").map_or(true, |v| v != "0");
                    }
                }
                b"i" => {
                    if let Some(font) = current_font.as_mut() {
                        font.italic = attr(&e, b"val").map_or(true, |v| v != "0");
                    }
                }
                b"sz" => {
                    if let Some(font) = current_font.as_mut() {
                        if let Some(size) = attr(&e, b"val").and_then(|v| v.parse().ok()) {
                            font.size = size;
                        }
                    }
                }
                b"name" => {
                    if let (Some(font), Some(name)) = (current_font.as_mut(), attr(&e, b"val")) {
                        font.name = name;
                    }
                }
                b"fill" if !is_empty => current_fill = Some(Fill::default()),
                b"patternFill" => {
                    let pattern = attr(&e, b"patternType")
                        .map(|v| PatternType::from_str(&v))
                        .unwrap_or(PatternType::None);
                    match current_fill.as_mut() {
                        Some(fill) => fill.pattern = pattern,
                        None => fills.push(Fill {
                            pattern,
                            color: None,
                        }),
                    }
                }
                b"fgColor" => {
                    if let (Some(fill), Some(color)) = (current_fill.as_mut(), rgb_color(&e)) {
                        fill.color = Some(color);
                    }
                }
                b"border" if !is_empty => current_border = Some(Border::default()),
                b"border" => borders.push(Border::default()),
                tag @ (b"left" | b"right" | b"top" | b"bottom") if current_border.is_some() => {
                    let name = match tag {
                        b"left" => "left",
                        b"right" => "right",
                        b"top" => "top",
                        _ => "bottom",
                    };
                    let style = attr(&e, b"style")
                        .map(|v| BorderLineStyle::from_str(&v))
                        .unwrap_or_default();
                    let edge = BorderEdge::new(style, Color::black());
                    if is_empty {
                        if let Some(border) = current_border.as_mut() {
                            set_border_edge(border, name, edge);
                        }
                    } else {
                        current_edge = Some((name, edge));
                    }
                }
                b"color" => {
                    if let Some(color) = rgb_color(&e) {
                        if let Some((_, edge)) = current_edge.as_mut() {
                            edge.color = color;
                        } else if let Some(font) = current_font.as_mut() {
                            font.color = color;
                        }
                    }
                }
                b"cellXfs" => in_cell_xfs = !is_empty,
                b"xf" if in_cell_xfs => {
                    let id = |key: &[u8]| attr(&e, key).and_then(|v| v.parse().ok()).unwrap_or(0);
                    cell_xfs.push((id(b"numFmtId"), id(b"fontId"), id(b"fillId"), id(b"borderId")));
                }
                _ => {}
            }
        }

        match event {
            Event::End(e) => match e.name().as_ref() {
                b"font" => fonts.extend(current_font.take()),
                b"fill" => fills.extend(current_fill.take()),
                b"border" => borders.extend(current_border.take()),
                b"left" | b"right" | b"top" | b"bottom" => {
                    if let (Some(border), Some((name, edge))) =
                        (current_border.as_mut(), current_edge.take())
                    {
                        set_border_edge(border, name, edge);
                    }
                }
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let styles = cell_xfs
        .into_iter()
        .map(|(num_fmt_id, font_id, fill_id, border_id)| Style {
            font: fonts.get(font_id as usize).cloned().unwrap_or_default(),
            fill: fills.get(fill_id as usize).cloned().unwrap_or_default(),
            border: borders.get(border_id as usize).cloned().unwrap_or_default(),
            number_format: number_format_code(num_fmt_id, &number_formats),
        })
        .collect();
    Ok(styles)
}

fn number_format_code(id: u32, custom: &AHashMap<u32, String>) -> String {
    if let Some(code) = custom.get(&id) {
        return code.clone();
    }
    BUILTIN_NUMBER_FORMATS
        .iter()
        .find(|(_, builtin_id)| *builtin_id == id)
        .map(|(code, _)| code.to_string())
        .unwrap_or_else(|| GENERAL_FORMAT.to_string())
}

fn set_border_edge(border: &mut Border, name: &str, edge: BorderEdge) {
    if edge.style == BorderLineStyle::None {
        return;
    }
    let slot = match name {
        "left" => &mut border.left,
        "right" => &mut border.right,
        "top" => &mut border.top,
        _ => &mut border.bottom,
    };
    *slot = Some(edge);
}

/// Unescaped value of attribute `key`
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn rgb_color(e: &BytesStart<'_>) -> Option<Color> {
    attr(e, b"rgb").map(|rgb| Color::new(Color::new(rgb).to_rgb_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_entries() {
        let table = StyleTable::new();
        assert_eq!(table.font_count(), 1);
        assert_eq!(table.fill_count(), 2);
        assert_eq!(table.border_count(), 1);
        assert_eq!(table.cell_format_count(), 1);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut table = StyleTable::new();
        let style = Style::new().bold(true).fill_color("yellow");
        let first = table.register_style(&style);
        let second = table.register_style(&style);
        assert_eq!(first, second);
        assert_eq!(first, 1);
        assert_eq!(table.cell_format_count(), 2);
        assert_eq!(table.register_style(&Style::default()), 0);
    }

    #[test]
    fn test_named_color_matches_hex() {
        let mut table = StyleTable::new();
        let named = Font {
            color: Color::new("red"),
            ..Font::default()
        };
        let hex = Font {
            color: Color::new("#ff0000"),
            ..Font::default()
        };
        assert_eq!(
            table.get_or_create_font_id(&named),
            table.get_or_create_font_id(&hex)
        );
        assert_eq!(table.font_count(), 2);

        let fill_a = table.get_or_create_fill_id(&Fill::solid(Color::new("gold")));
        let fill_b = table.get_or_create_fill_id(&Fill::solid(Color::new("FFD700")));
        assert_eq!(fill_a, fill_b);
        assert_eq!(fill_a, 2);
    }

    #[test]
    fn test_number_format_ids() {
        let mut table = StyleTable::new();
        assert_eq!(table.get_or_create_number_format_id("General"), 0);
        assert_eq!(table.get_or_create_number_format_id("0.00%"), 10);
        assert_eq!(table.get_or_create_number_format_id("mm/dd/yyyy"), 14);
        assert_eq!(table.get_or_create_number_format_id("0.000"), 164);
        assert_eq!(table.get_or_create_number_format_id("$#,##0"), 165);
        assert_eq!(table.get_or_create_number_format_id("0.000"), 164);
        assert_eq!(table.custom_number_formats().len(), 2);
    }

    #[test]
    fn test_styles_xml_round_trip() {
        let mut table = StyleTable::new();
        let style = Style::new()
            .bold(true)
            .italic(true)
            .font_size(14.0)
            .font_color("blue")
            .fill_color("lightgray")
            .border_all(BorderLineStyle::Thin, "red")
            .number_format("0.000");
        let id = table.register_style(&style);

        let xml = table.to_xml();
        assert!(xml.contains("<numFmt numFmtId=\"164\" formatCode=\"0.000\"/>"));
        assert!(xml.contains("<fill><patternFill patternType=\"gray125\"/></fill>"));

        let styles = read_styles_xml(xml.as_bytes()).unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0], Style::default());
        assert_eq!(styles[id as usize], style);
    }
}
