//! XLSX reader

mod worksheet;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ahash::AHashMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::drawing::read_drawing_xml;
use crate::error::{XlsxError, XlsxResult};
use crate::shared_strings::read_shared_strings;
use crate::styles::{attr, read_styles_xml};
use cellforge_core::{Image, ImageFormat, Workbook, Worksheet};
use worksheet::{read_worksheet, SheetLinks};

/// Options for reading XLSX files
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Rebuild cell styles from `xl/styles.xml` (default: true)
    pub read_styles: bool,
    /// Load pictures from drawing parts (default: true)
    pub read_images: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            read_styles: true,
            read_images: true,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(mut self, read: bool) -> Self {
        self.read_styles = read;
        self
    }

    pub fn with_images(mut self, read: bool) -> Self {
        self.read_images = read;
        self
    }
}

/// Read a workbook from a file path with default options
pub fn read_xlsx_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
    XlsxReader::new().read_file(path)
}

/// Read a workbook from any seekable reader with default options
pub fn read_xlsx<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
    XlsxReader::new().read(reader)
}

/// A `<sheet>` entry of `xl/workbook.xml`
#[derive(Debug, Clone, PartialEq)]
struct SheetEntry {
    name: String,
    sheet_id: Option<u32>,
    rel_id: Option<String>,
}

/// A `<Relationship>` with its target resolved to a package path
#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    rel_type: String,
    target: String,
    external: bool,
}

/// XLSX file reader
#[derive(Debug, Clone, Default)]
pub struct XlsxReader {
    options: ReaderOptions,
}

impl XlsxReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(&self, reader: R) -> XlsxResult<Workbook> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| XlsxError::FileFormat(format!("not a ZIP package: {}", e)))?;

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
            .ok_or_else(|| XlsxError::FileFormat("missing xl/workbook.xml".into()))?;
        let entries = read_workbook_xml(workbook_xml.as_slice())?;

        let workbook_rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(data) => read_relationships(data.as_slice(), "xl")?,
            None => {
                log::warn!("missing xl/_rels/workbook.xml.rels, guessing sheet paths");
                AHashMap::new()
            }
        };

        let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(data) => read_shared_strings(data.as_slice())?,
            None => Vec::new(),
        };

        let styles = match read_part(&mut archive, "xl/styles.xml")? {
            Some(data) if self.options.read_styles => read_styles_xml(data.as_slice())?,
            _ => Vec::new(),
        };

        let mut workbook = Workbook::empty();
        for entry in &entries {
            let index = workbook.add_worksheet_with_name(&entry.name)?;
            let Some(sheet) = workbook.worksheet_mut(index) else {
                continue;
            };

            let path = match sheet_path(entry, &workbook_rels, &archive) {
                Some(path) => path,
                None => {
                    log::warn!("worksheet {:?} has no part, leaving it empty", entry.name);
                    continue;
                }
            };
            let Some(data) = read_part(&mut archive, &path)? else {
                log::warn!("worksheet part {} not found, leaving {:?} empty", path, entry.name);
                continue;
            };

            log::debug!("reading {} ({})", path, entry.name);
            let links = read_worksheet(data.as_slice(), sheet, &shared_strings, &styles)?;
            self.resolve_sheet_links(&mut archive, &path, links, sheet)?;
        }

        if let Some(data) = read_part(&mut archive, "docProps/core.xml")? {
            read_core_properties(data.as_slice(), &mut workbook)?;
        }

        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }

        Ok(workbook)
    }

    /// Attach hyperlinks and pictures that the sheet references by `r:id`
    fn resolve_sheet_links<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        sheet_path: &str,
        links: SheetLinks,
        sheet: &mut Worksheet,
    ) -> XlsxResult<()> {
        if links.hyperlinks.is_empty() && links.drawing.is_none() {
            return Ok(());
        }

        let rels = match read_part(archive, &rels_path(sheet_path))? {
            Some(data) => read_relationships(data.as_slice(), parent_dir(sheet_path))?,
            None => AHashMap::new(),
        };

        for link in links.hyperlinks {
            let target = link
                .rel_id
                .as_ref()
                .and_then(|id| rels.get(id))
                .map(|rel| rel.target.clone());
            match target {
                Some(target) => {
                    if let Err(err) = sheet.set_hyperlink(&link.cell, target) {
                        log::warn!("skipping hyperlink on {}: {}", link.cell, err);
                    }
                }
                None => log::warn!("skipping unresolved hyperlink on {}", link.cell),
            }
        }

        if !self.options.read_images {
            return Ok(());
        }
        let drawing = links
            .drawing
            .as_ref()
            .and_then(|id| rels.get(id))
            .filter(|rel| rel.rel_type.ends_with("/drawing"));
        if let Some(drawing) = drawing {
            read_drawing(archive, &drawing.target, sheet)?;
        }
        Ok(())
    }
}

/// Worksheet part for a `<sheet>` entry: its relationship first, then the
/// conventional `sheet{sheetId}.xml` name
fn sheet_path<R: Read + Seek>(
    entry: &SheetEntry,
    workbook_rels: &AHashMap<String, Relationship>,
    archive: &ZipArchive<R>,
) -> Option<String> {
    let by_rel = entry
        .rel_id
        .as_ref()
        .and_then(|id| workbook_rels.get(id))
        .filter(|rel| rel.rel_type.ends_with("/worksheet"))
        .map(|rel| rel.target.clone());
    if by_rel.is_some() {
        return by_rel;
    }

    let fallback = format!("xl/worksheets/sheet{}.xml", entry.sheet_id?);
    let exists = archive.file_names().any(|name| name == fallback);
    exists.then_some(fallback)
}

fn read_drawing<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    drawing_path: &str,
    sheet: &mut Worksheet,
) -> XlsxResult<()> {
    let Some(data) = read_part(archive, drawing_path)? else {
        log::warn!("drawing part {} not found", drawing_path);
        return Ok(());
    };
    let pictures = read_drawing_xml(data.as_slice())?;
    let rels = match read_part(archive, &rels_path(drawing_path))? {
        Some(data) => read_relationships(data.as_slice(), parent_dir(drawing_path))?,
        None => AHashMap::new(),
    };

    for picture in pictures {
        let Some(rel) = rels.get(&picture.embed).filter(|rel| !rel.external) else {
            log::warn!("skipping picture with unresolved media {}", picture.embed);
            continue;
        };
        let Some(bytes) = read_part(archive, &rel.target)? else {
            log::warn!("media part {} not found", rel.target);
            continue;
        };

        let mut image = match ImageFormat::detect(&bytes) {
            Some(format) => Image::with_format(bytes, format),
            None => {
                let ext = rel.target.rsplit('.').next().unwrap_or_default();
                Image::with_format(bytes, ImageFormat::from_extension(ext))
            }
        };
        if let Some((width, height)) = picture.size {
            image.resize(Some(width), Some(height));
        }
        image.anchor = picture.anchor;
        image.name = picture.name;
        image.description = picture.description;
        sheet.images_mut().add(image);
    }
    Ok(())
}

/// Read a whole ZIP member, `None` when the package has no such part
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> XlsxResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn read_workbook_xml<R: Read>(reader: R) -> XlsxResult<Vec<SheetEntry>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"sheet" => {
                let Some(name) = attr(&e, b"name") else {
                    return Err(XlsxError::Parse("sheet entry without a name".into()));
                };
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                sheets.push(SheetEntry {
                    name,
                    sheet_id: attr(&e, b"sheetId").and_then(|v| v.parse().ok()),
                    rel_id,
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Parse a relationships part, resolving targets against `base_dir`
fn read_relationships<R: Read>(
    reader: R,
    base_dir: &str,
) -> XlsxResult<AHashMap<String, Relationship>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = AHashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr(&e, b"Id");
                let target = attr(&e, b"Target");
                if let (Some(id), Some(target)) = (id, target) {
                    let external = attr(&e, b"TargetMode").map_or(false, |m| m == "External");
                    let target = if external {
                        target
                    } else {
                        resolve_target(base_dir, &target)
                    };
                    rels.insert(
                        id,
                        Relationship {
                            rel_type: attr(&e, b"Type").unwrap_or_default(),
                            target,
                            external,
                        },
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Title and creator from `docProps/core.xml`
fn read_core_properties<R: Read>(reader: R, workbook: &mut Workbook) -> XlsxResult<()> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut field: Option<Vec<u8>> = None;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => field = Some(e.local_name().as_ref().to_vec()),
            Event::Text(t) => {
                let props = workbook.properties_mut();
                match field.as_deref() {
                    Some(b"title") => props.title = Some(t.unescape()?.into_owned()),
                    Some(b"creator") => props.creator = Some(t.unescape()?.into_owned()),
                    _ => {}
                }
            }
            Event::End(_) => field = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn package(parts: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
        <sheets>
          <sheet name="Data" sheetId="1" r:id="rId1"/>
          <sheet name="Guessed" sheetId="2" r:id="rId9"/>
          <sheet name="Missing" sheetId="7" r:id="rId8"/>
        </sheets></workbook>"#;

    const RELS: &str = r#"<Relationships>
        <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
        </Relationships>"#;

    #[test]
    fn test_not_a_zip() {
        let err = read_xlsx(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::FileFormat(_)));
    }

    #[test]
    fn test_missing_workbook_part() {
        let err = read_xlsx(package(&[("[Content_Types].xml", "<Types/>")])).unwrap_err();
        assert!(matches!(err, XlsxError::FileFormat(_)));
    }

    #[test]
    fn test_sheet_resolution() {
        let workbook = read_xlsx(package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            (
                "xl/worksheets/data.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
            (
                "xl/worksheets/sheet2.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>2</v></c></row></sheetData></worksheet>"#,
            ),
        ]))
        .unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Data", "Guessed", "Missing"]);
        let value = |i: usize| workbook.worksheet(i).unwrap().get_value("A1").unwrap().clone();
        assert_eq!(value(0), cellforge_core::CellValue::Number(1.0));
        assert_eq!(value(1), cellforge_core::CellValue::Number(2.0));
        assert!(workbook.worksheet(2).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../drawings/drawing1.xml"), "xl/drawings/drawing1.xml");
        assert_eq!(resolve_target("xl", "/xl/styles.xml"), "xl/styles.xml");
        assert_eq!(rels_path("xl/drawings/drawing1.xml"), "xl/drawings/_rels/drawing1.xml.rels");
    }

    #[test]
    fn test_core_properties() {
        let mut workbook = Workbook::new();
        let xml = r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc">
            <dc:title>Budget &amp; Plan</dc:title><dc:creator>ops</dc:creator></cp:coreProperties>"#;
        read_core_properties(xml.as_bytes(), &mut workbook).unwrap();
        assert_eq!(workbook.properties().title.as_deref(), Some("Budget & Plan"));
        assert_eq!(workbook.properties().creator.as_deref(), Some("ops"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("B2", "on disk").unwrap();
        crate::write_xlsx_file(&workbook, &path).unwrap();

        let read = read_xlsx_file(&path).unwrap();
        assert_eq!(
            read.worksheet(0).unwrap().get_value("B2").unwrap().as_text(),
            Some("on disk")
        );

        let missing = dir.path().join("missing.xlsx");
        assert!(matches!(read_xlsx_file(&missing), Err(XlsxError::Io(_))));
    }
}
