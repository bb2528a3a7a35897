//! Shared string table (`xl/sharedStrings.xml`)

use std::io::{BufReader, Read};

use ahash::AHashMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{decode_excel_escapes, escape_cell_text};

/// Deduplicated strings in first-seen order
///
/// `count` in the rendered part is the number of references, `uniqueCount`
/// the number of entries.
#[derive(Debug, Default)]
pub struct SharedStringPool {
    strings: Vec<String>,
    index: AHashMap<String, u32>,
    references: usize,
}

impl SharedStringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `s`, adding it on first sight
    pub fn add(&mut self, s: &str) -> u32 {
        self.references += 1;
        if let Some(&idx) = self.index.get(s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), idx);
        idx
    }

    pub fn get(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references,
            self.strings.len()
        );
        for s in &self.strings {
            // Leading/trailing whitespace is dropped by readers unless preserved
            if s.trim() != s {
                xml.push_str(&format!(
                    "\n  <si><t xml:space=\"preserve\">{}</t></si>",
                    escape_cell_text(s)
                ));
            } else {
                xml.push_str(&format!("\n  <si><t>{}</t></si>", escape_cell_text(s)));
            }
        }
        xml.push_str("\n</sst>");
        xml
    }
}

/// Read the shared string table; rich-text runs are concatenated
pub(crate) fn read_shared_strings<R: Read>(reader: R) -> XlsxResult<Vec<String>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    // Phonetic runs carry <t> elements that are not part of the value
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current).into_owned());
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(e) if in_t => current.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}
