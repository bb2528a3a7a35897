//! XLSX writer

mod worksheet;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::drawing::{drawing_rels_xml, drawing_xml};
use crate::error::XlsxResult;
use crate::shared_strings::SharedStringPool;
use crate::styles::StyleTable;
use crate::theme::{THEME_PART, THEME_XML};
use crate::xml::escape_xml;
use cellforge_core::{ImageFormat, Workbook, Worksheet};
use worksheet::{render_worksheet, SheetPart};

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";

/// Options for writing XLSX files
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Evaluate formulas that carry no cached value (default: true)
    ///
    /// When off, such cells are written with `<f>` only and no `<v>`.
    pub compute_missing_cached_values: bool,
    /// Write `docProps/core.xml` and `docProps/app.xml` (default: true)
    pub write_doc_props: bool,
    /// Application name recorded in `docProps/app.xml`
    pub application_name: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compute_missing_cached_values: true,
            write_doc_props: true,
            application_name: "cellforge".to_string(),
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compute_missing_cached_values(mut self, compute: bool) -> Self {
        self.compute_missing_cached_values = compute;
        self
    }

    pub fn with_doc_props(mut self, write: bool) -> Self {
        self.write_doc_props = write;
        self
    }

    pub fn with_application_name<S: Into<String>>(mut self, name: S) -> Self {
        self.application_name = name.into();
        self
    }
}

/// Write a workbook to a file path with default options
pub fn write_xlsx_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
    XlsxWriter::new().write_file(workbook, path)
}

/// Write a workbook to any seekable writer with default options
pub fn write_xlsx<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
    XlsxWriter::new().write(workbook, writer)
}

/// An image payload stored under `xl/media/`
struct MediaPart<'a> {
    path: String,
    data: &'a [u8],
}

/// XLSX file writer
///
/// Style and string tables live for a single `write` call.
#[derive(Debug, Clone, Default)]
pub struct XlsxWriter {
    options: WriterOptions,
}

impl XlsxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(&self, workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        self.write(workbook, file)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(&self, workbook: &Workbook, writer: W) -> XlsxResult<()> {
        // A package needs at least one sheet
        let placeholder;
        let sheets: Vec<&Worksheet> = if workbook.is_empty() {
            placeholder = Worksheet::new("Sheet1");
            vec![&placeholder]
        } else {
            workbook.worksheets().collect()
        };

        // Render sheet bodies first so the style and string tables are
        // complete before styles.xml and sharedStrings.xml are written
        let mut styles = StyleTable::new();
        let mut strings = SharedStringPool::new();
        let parts: Vec<SheetPart<'_>> = sheets
            .iter()
            .map(|&sheet| render_worksheet(sheet, &mut styles, &mut strings, &self.options))
            .collect();

        let mut media = Vec::new();
        let mut drawings = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            if part.images.is_empty() {
                continue;
            }
            let mut targets = Vec::new();
            for image in &part.images {
                let file_name = format!("image{}.{}", media.len() + 1, image.format().extension());
                targets.push(format!("../media/{}", file_name));
                media.push(MediaPart {
                    path: format!("xl/media/{}", file_name),
                    data: image.data(),
                });
            }
            drawings.push((i, targets));
        }
        let extensions: BTreeSet<ImageFormat> = parts
            .iter()
            .flat_map(|p| p.images.iter().map(|i| i.format()))
            .collect();

        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default();

        let content_types = self.content_types_xml(
            parts.len(),
            drawings.len(),
            &extensions,
            !strings.is_empty(),
        );
        write_part(&mut zip, options, "[Content_Types].xml", &content_types)?;
        write_part(&mut zip, options, "_rels/.rels", &self.root_rels_xml())?;

        if self.options.write_doc_props {
            write_part(&mut zip, options, "docProps/core.xml", &core_props_xml(workbook))?;
            write_part(&mut zip, options, "docProps/app.xml", &self.app_props_xml(&sheets))?;
        }

        write_part(&mut zip, options, "xl/workbook.xml", &workbook_xml(&sheets))?;
        write_part(
            &mut zip,
            options,
            "xl/_rels/workbook.xml.rels",
            &workbook_rels_xml(sheets.len(), !strings.is_empty()),
        )?;
        write_part(&mut zip, options, "xl/styles.xml", &styles.to_xml())?;
        write_part(&mut zip, options, THEME_PART, THEME_XML)?;
        if !strings.is_empty() {
            write_part(&mut zip, options, "xl/sharedStrings.xml", &strings.to_xml())?;
        }

        let mut drawing_numbers = drawings.iter().map(|(i, _)| *i).enumerate();
        for (i, part) in parts.iter().enumerate() {
            let sheet_path = format!("xl/worksheets/sheet{}.xml", i + 1);
            log::debug!("writing {} ({})", sheet_path, sheets[i].name());
            write_part(&mut zip, options, &sheet_path, &part.xml)?;

            if part.has_relationships() {
                let drawing = if part.images.is_empty() {
                    None
                } else {
                    drawing_numbers.next().map(|(n, _)| n + 1)
                };
                write_part(
                    &mut zip,
                    options,
                    &format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1),
                    &sheet_rels_xml(part, drawing),
                )?;
            }
        }

        for (n, (sheet_index, targets)) in drawings.iter().enumerate() {
            write_part(
                &mut zip,
                options,
                &format!("xl/drawings/drawing{}.xml", n + 1),
                &drawing_xml(&parts[*sheet_index].images),
            )?;
            write_part(
                &mut zip,
                options,
                &format!("xl/drawings/_rels/drawing{}.xml.rels", n + 1),
                &drawing_rels_xml(targets),
            )?;
        }

        for part in &media {
            zip.start_file(part.path.as_str(), options)?;
            zip.write_all(part.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(
        &self,
        sheet_count: usize,
        drawing_count: usize,
        image_formats: &BTreeSet<ImageFormat>,
        has_shared_strings: bool,
    ) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for format in image_formats {
            content.push_str(&format!(
                "\n  <Default Extension=\"{}\" ContentType=\"{}\"/>",
                format.extension(),
                format.content_type()
            ));
        }

        content.push_str(
            r#"
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
  <Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        );
        if has_shared_strings {
            content.push_str(
                r#"
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
            );
        }
        for i in 1..=sheet_count {
            content.push_str(&format!(
                r#"
  <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        for i in 1..=drawing_count {
            content.push_str(&format!(
                r#"
  <Override PartName="/xl/drawings/drawing{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
                i
            ));
        }
        if self.options.write_doc_props {
            content.push_str(
                r#"
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
  <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
            );
        }

        content.push_str("\n</Types>");
        content
    }

    fn root_rels_xml(&self) -> String {
        let mut rels = vec![(REL_OFFICE_DOCUMENT, "xl/workbook.xml".to_string())];
        if self.options.write_doc_props {
            rels.push((REL_CORE_PROPERTIES, "docProps/core.xml".to_string()));
            rels.push((REL_EXTENDED_PROPERTIES, "docProps/app.xml".to_string()));
        }
        relationships_xml(&rels, false)
    }

    fn app_props_xml(&self, sheets: &[&Worksheet]) -> String {
        let mut titles = String::new();
        for sheet in sheets {
            titles.push_str(&format!("<vt:lpstr>{}</vt:lpstr>", escape_xml(sheet.name())));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <Application>{}</Application>
  <DocSecurity>0</DocSecurity>
  <ScaleCrop>false</ScaleCrop>
  <TitlesOfParts><vt:vector size="{}" baseType="lpstr">{}</vt:vector></TitlesOfParts>
  <LinksUpToDate>false</LinksUpToDate>
  <SharedDoc>false</SharedDoc>
  <HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#,
            escape_xml(&self.options.application_name),
            sheets.len(),
            titles
        )
    }
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    content: &str,
) -> XlsxResult<()> {
    zip.start_file(name, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

/// Relationships part; `rels[k]` becomes `rId{k+1}`
fn relationships_xml(rels: &[(&str, String)], external: bool) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (rel_type, target)) in rels.iter().enumerate() {
        let mode = if external && *rel_type == REL_HYPERLINK {
            " TargetMode=\"External\""
        } else {
            ""
        };
        xml.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"{}\"{}/>",
            i + 1,
            rel_type,
            escape_xml(target),
            mode
        ));
    }
    xml.push_str("\n</Relationships>");
    xml
}

fn workbook_xml(sheets: &[&Worksheet]) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <bookViews><workbookView activeTab="0"/></bookViews>
  <sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        content.push_str(&format!(
            "\n    <sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape_xml(sheet.name()),
            i + 1,
            i + 1
        ));
    }
    content.push_str("\n  </sheets>\n</workbook>");
    content
}

/// Sheets take `rId1..N`, then styles, theme and (optionally) shared strings
fn workbook_rels_xml(sheet_count: usize, has_shared_strings: bool) -> String {
    let mut rels: Vec<(&str, String)> = (1..=sheet_count)
        .map(|i| (REL_WORKSHEET, format!("worksheets/sheet{}.xml", i)))
        .collect();
    rels.push((REL_STYLES, "styles.xml".to_string()));
    rels.push((REL_THEME, "theme/theme1.xml".to_string()));
    if has_shared_strings {
        rels.push((REL_SHARED_STRINGS, "sharedStrings.xml".to_string()));
    }
    relationships_xml(&rels, false)
}

fn sheet_rels_xml(part: &SheetPart<'_>, drawing: Option<usize>) -> String {
    let mut rels: Vec<(&str, String)> = part
        .hyperlinks
        .iter()
        .map(|url| (REL_HYPERLINK, url.clone()))
        .collect();
    if let Some(n) = drawing {
        rels.push((REL_DRAWING, format!("../drawings/drawing{}.xml", n)));
    }
    relationships_xml(&rels, true)
}

fn core_props_xml(workbook: &Workbook) -> String {
    let props = workbook.properties();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(title) = &props.title {
        xml.push_str(&format!("\n  <dc:title>{}</dc:title>", escape_xml(title)));
    }
    if let Some(creator) = &props.creator {
        xml.push_str(&format!("\n  <dc:creator>{}</dc:creator>", escape_xml(creator)));
    }
    xml.push_str(&format!(
        "\n  <dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>\n  <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>",
        now = now
    ));
    xml.push_str("\n</cp:coreProperties>");
    xml
}
