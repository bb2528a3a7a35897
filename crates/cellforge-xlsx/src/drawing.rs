//! Drawing parts (`xl/drawings/drawingN.xml`) carrying embedded pictures

use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::escape_xml;
use cellforge_core::{emu_to_px, px_to_emu, Anchor, CellReference, Image};

const NS_XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

// === Writing ===

/// Render the drawing part for `images`; picture `k` (1-based) embeds `rId{k}`
pub(crate) fn drawing_xml(images: &[&Image]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="{}" xmlns:a="{}" xmlns:r="{}">"#,
        NS_XDR, NS_A, NS_R
    );
    for (i, image) in images.iter().enumerate() {
        xml.push_str(&anchor_xml(image, i + 1));
    }
    xml.push_str("\n</xdr:wsDr>");
    xml
}

/// Relationships of a drawing part; `targets[k-1]` is the media path of `rId{k}`
pub(crate) fn drawing_rels_xml(targets: &[String]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, target) in targets.iter().enumerate() {
        xml.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"{}\"/>",
            i + 1,
            REL_IMAGE,
            escape_xml(target)
        ));
    }
    xml.push_str("\n</Relationships>");
    xml
}

fn anchor_xml(image: &Image, index: usize) -> String {
    let cx = px_to_emu(image.display_width());
    let cy = px_to_emu(image.display_height());
    let pic = pic_xml(image, index, cx, cy);

    match &image.anchor {
        Anchor::OneCell { from, from_offset } => format!(
            "\n  <xdr:oneCellAnchor>{}<xdr:ext cx=\"{}\" cy=\"{}\"/>{}<xdr:clientData/></xdr:oneCellAnchor>",
            marker_xml("from", from, *from_offset),
            cx,
            cy,
            pic
        ),
        Anchor::TwoCell {
            from,
            from_offset,
            to,
            to_offset,
        } => format!(
            "\n  <xdr:twoCellAnchor editAs=\"oneCell\">{}{}{}<xdr:clientData/></xdr:twoCellAnchor>",
            marker_xml("from", from, *from_offset),
            marker_xml("to", to, *to_offset),
            pic
        ),
        Anchor::Absolute { x, y } => format!(
            "\n  <xdr:absoluteAnchor><xdr:pos x=\"{}\" y=\"{}\"/><xdr:ext cx=\"{}\" cy=\"{}\"/>{}<xdr:clientData/></xdr:absoluteAnchor>",
            px_to_emu(*x),
            px_to_emu(*y),
            cx,
            cy,
            pic
        ),
    }
}

/// Anchor markers are 0-based
fn marker_xml(tag: &str, cell: &CellReference, offset: (u32, u32)) -> String {
    format!(
        "<xdr:{tag}><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:{tag}>",
        cell.col.saturating_sub(1),
        px_to_emu(offset.0),
        cell.row.saturating_sub(1),
        px_to_emu(offset.1),
        tag = tag
    )
}

fn pic_xml(image: &Image, index: usize, cx: u64, cy: u64) -> String {
    let name = image
        .name
        .clone()
        .unwrap_or_else(|| format!("Picture {}", index));
    let descr = image
        .description
        .as_deref()
        .map(|d| format!(" descr=\"{}\"", escape_xml(d)))
        .unwrap_or_default();
    format!(
        concat!(
            "<xdr:pic>",
            "<xdr:nvPicPr><xdr:cNvPr id=\"{id}\" name=\"{name}\"{descr}/>",
            "<xdr:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></xdr:cNvPicPr></xdr:nvPicPr>",
            "<xdr:blipFill><a:blip r:embed=\"rId{index}\"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>",
            "<xdr:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></xdr:spPr>",
            "</xdr:pic>"
        ),
        id = index + 1,
        name = escape_xml(&name),
        descr = descr,
        index = index,
        cx = cx,
        cy = cy
    )
}

// === Reading ===

/// One picture found in a drawing part
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawingPicture {
    pub anchor: Anchor,
    /// Relationship id of the embedded media
    pub embed: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Extent in pixels
    pub size: Option<(u32, u32)>,
}

#[derive(Default)]
struct Marker {
    col: u32,
    col_off: u64,
    row: u32,
    row_off: u64,
}

impl Marker {
    /// Markers are 0-based; `None` when the cell falls outside the grid
    fn cell(&self) -> Option<CellReference> {
        let row = self.row.checked_add(1)?;
        let col = self.col.checked_add(1)?;
        CellReference::checked(row, col).ok()
    }

    fn offset(&self) -> (u32, u32) {
        (emu_to_px(self.col_off), emu_to_px(self.row_off))
    }
}

/// Parse the pictures of a drawing part; non-picture shapes are skipped
pub(crate) fn read_drawing_xml<R: Read>(reader: R) -> XlsxResult<Vec<DrawingPicture>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut pictures = Vec::new();

    let mut kind: Option<Vec<u8>> = None;
    let mut from = Marker::default();
    let mut to = Marker::default();
    let mut in_to = false;
    let mut leaf: Option<Vec<u8>> = None;
    let mut pos = (0u64, 0u64);
    let mut ext: Option<(u64, u64)> = None;
    let mut embed: Option<String> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                k @ (b"oneCellAnchor" | b"twoCellAnchor" | b"absoluteAnchor") => {
                    kind = Some(k.to_vec());
                    from = Marker::default();
                    to = Marker::default();
                    pos = (0, 0);
                    ext = None;
                    embed = None;
                    name = None;
                    description = None;
                }
                b"from" => in_to = false,
                b"to" => in_to = true,
                l @ (b"col" | b"colOff" | b"row" | b"rowOff") => leaf = Some(l.to_vec()),
                b"cNvPr" => read_cnvpr(&e, &mut name, &mut description),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"ext" => {
                    let cx = local_attr(&e, b"cx").and_then(|v| v.parse().ok());
                    let cy = local_attr(&e, b"cy").and_then(|v| v.parse().ok());
                    if let (Some(cx), Some(cy)) = (cx, cy) {
                        ext = Some((cx, cy));
                    }
                }
                b"pos" => {
                    let x = local_attr(&e, b"x").and_then(|v| v.parse().ok());
                    let y = local_attr(&e, b"y").and_then(|v| v.parse().ok());
                    pos = (x.unwrap_or(0), y.unwrap_or(0));
                }
                b"cNvPr" => read_cnvpr(&e, &mut name, &mut description),
                b"blip" => embed = local_attr(&e, b"embed"),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(l) = leaf.as_deref() {
                    let text = t.unescape()?;
                    let marker = if in_to { &mut to } else { &mut from };
                    match l {
                        b"col" => marker.col = text.trim().parse().unwrap_or(0),
                        b"colOff" => marker.col_off = text.trim().parse().unwrap_or(0),
                        b"row" => marker.row = text.trim().parse().unwrap_or(0),
                        _ => marker.row_off = text.trim().parse().unwrap_or(0),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"col" | b"colOff" | b"row" | b"rowOff" => leaf = None,
                k @ (b"oneCellAnchor" | b"twoCellAnchor" | b"absoluteAnchor")
                    if kind.as_deref() == Some(k) =>
                {
                    let anchor = match k {
                        b"oneCellAnchor" => from.cell().map(|cell| Anchor::OneCell {
                            from: cell,
                            from_offset: from.offset(),
                        }),
                        b"twoCellAnchor" => from.cell().zip(to.cell()).map(|(start, end)| {
                            Anchor::TwoCell {
                                from: start,
                                from_offset: from.offset(),
                                to: end,
                                to_offset: to.offset(),
                            }
                        }),
                        _ => Some(Anchor::Absolute {
                            x: emu_to_px(pos.0),
                            y: emu_to_px(pos.1),
                        }),
                    };
                    match (anchor, embed.take()) {
                        (None, _) => {
                            log::warn!("skipping picture anchored outside the grid");
                            name = None;
                            description = None;
                        }
                        (Some(anchor), Some(embed)) => pictures.push(DrawingPicture {
                            anchor,
                            embed,
                            name: name.take(),
                            description: description.take(),
                            size: ext.map(|(cx, cy)| (emu_to_px(cx), emu_to_px(cy))),
                        }),
                        (Some(_), None) => log::debug!("skipping drawing anchor without a picture"),
                    }
                    kind = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(pictures)
}

fn read_cnvpr(e: &BytesStart<'_>, name: &mut Option<String>, description: &mut Option<String>) {
    *name = local_attr(e, b"name");
    *description = local_attr(e, b"descr");
}

/// Attribute value matched on its local name, ignoring any prefix
fn local_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_core::EMU_PER_PIXEL;
    use pretty_assertions::assert_eq;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn test_anchor_kinds() {
        let one = Image::from_bytes(png(40, 20))
            .with_anchor(Anchor::one_cell(CellReference::new(2, 3)))
            .with_name("logo");
        let two = Image::from_bytes(png(10, 10)).with_anchor(Anchor::at_cell("A1").unwrap());
        let abs = Image::from_bytes(Vec::new()).with_anchor(Anchor::absolute(5, 7));

        let xml = drawing_xml(&[&one, &two, &abs]);
        assert!(xml.contains("<xdr:oneCellAnchor><xdr:from><xdr:col>2</xdr:col>"));
        assert!(xml.contains("<xdr:row>1</xdr:row>"));
        assert!(xml.contains(&format!("cx=\"{}\" cy=\"{}\"", 40 * EMU_PER_PIXEL, 20 * EMU_PER_PIXEL)));
        assert!(xml.contains("<xdr:twoCellAnchor editAs=\"oneCell\">"));
        assert!(xml.contains("<xdr:to><xdr:col>3</xdr:col>"));
        assert!(xml.contains(&format!("<xdr:pos x=\"{}\" y=\"{}\"/>", 5 * 9525, 7 * 9525)));
        // Unknown size falls back to 100px
        assert!(xml.contains(&format!("cx=\"{}\"", 100 * 9525)));
        assert!(xml.contains("r:embed=\"rId3\""));
    }

    #[test]
    fn test_read_back() {
        let image = Image::from_bytes(png(64, 32))
            .with_anchor(Anchor::OneCell {
                from: CellReference::new(4, 2),
                from_offset: (3, 6),
            })
            .with_name("chart")
            .with_description("Q1 <sales>");
        let absolute = Image::from_bytes(png(8, 8)).with_anchor(Anchor::absolute(12, 24));

        let pictures = read_drawing_xml(drawing_xml(&[&image, &absolute]).as_bytes()).unwrap();
        assert_eq!(pictures.len(), 2);
        assert_eq!(pictures[0].anchor, image.anchor);
        assert_eq!(pictures[0].embed, "rId1");
        assert_eq!(pictures[0].name.as_deref(), Some("chart"));
        assert_eq!(pictures[0].description.as_deref(), Some("Q1 <sales>"));
        assert_eq!(pictures[0].size, Some((64, 32)));
        assert_eq!(pictures[1].anchor, Anchor::absolute(12, 24));
        assert_eq!(pictures[1].embed, "rId2");
    }

    fn one_cell_anchor(row: &str, col: &str, cx: &str) -> String {
        format!(
            r#"<xdr:wsDr xmlns:xdr="xdr" xmlns:a="a" xmlns:r="r"><xdr:oneCellAnchor>
            <xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
            <xdr:ext cx="{cx}" cy="9525"/>
            <xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Picture"/></xdr:nvPicPr>
            <xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic>
            <xdr:clientData/></xdr:oneCellAnchor></xdr:wsDr>"#,
            row = row,
            col = col,
            cx = cx
        )
    }

    #[test]
    fn test_out_of_grid_markers_skipped() {
        for (row, col) in [("4294967295", "0"), ("0", "4294967295"), ("1048576", "0"), ("0", "16384")] {
            let xml = one_cell_anchor(row, col, "9525");
            let pictures = read_drawing_xml(xml.as_bytes()).unwrap();
            assert!(pictures.is_empty(), "row {} col {}", row, col);
        }

        // Last cell of the grid is still accepted
        let xml = one_cell_anchor("1048575", "16383", "9525");
        let pictures = read_drawing_xml(xml.as_bytes()).unwrap();
        assert_eq!(
            pictures[0].anchor,
            Anchor::one_cell(CellReference::new(1_048_576, 16_384))
        );
    }

    #[test]
    fn test_huge_extent_saturates() {
        let xml = one_cell_anchor("0", "0", "18446744073709551615");
        let pictures = read_drawing_xml(xml.as_bytes()).unwrap();
        assert_eq!(pictures[0].size, Some((u32::MAX, 1)));
    }

    #[test]
    fn test_rels() {
        let xml = drawing_rels_xml(&["../media/image1.png".to_string()]);
        assert!(xml.contains("Id=\"rId1\""));
        assert!(xml.contains("Target=\"../media/image1.png\""));
    }
}
