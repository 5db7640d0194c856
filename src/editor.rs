//! In-place editing of an existing workbook.
//!
//! The worksheet part is held as raw XML and modified by splicing: appended
//! rows go in front of `</sheetData>`, single-cell overwrites replace one
//! `<c>` element inside its row. Everything else in the package is copied
//! through untouched on save.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::cell::{CellValue, col_letters, col_number};
use crate::error::{Result, TableError, open_existing};

pub struct SheetEditor {
    src_path: PathBuf,
    sheet_xml: Vec<u8>,
    last_row: u32,
}

impl SheetEditor {
    /// Opens the workbook and prepares its worksheet for editing. A missing
    /// file fails with [`TableError::NotFound`] and creates nothing on disk.
    pub fn open<P: AsRef<Path>>(src: P) -> Result<Self> {
        let src_path = src.as_ref().to_path_buf();
        let mut zip = ZipArchive::new(open_existing(&src_path)?)?;

        let sheet_xml: Vec<u8> = {
            let mut sheet = zip.by_name(crate::SHEET_PART).map_err(|_| {
                TableError::Sheet(format!("{} missing from archive", crate::SHEET_PART))
            })?;
            let mut buf = Vec::with_capacity(sheet.size() as usize);
            sheet.read_to_end(&mut buf)?;
            buf
        };

        let last_row = calc_last_row(&sheet_xml);

        Ok(Self {
            src_path,
            sheet_xml,
            last_row,
        })
    }

    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    /// Appends one row after the current last row.
    pub fn append_row(&mut self, cells: &[CellValue]) -> Result<()> {
        self.last_row += 1;
        let row_num = self.last_row;
        let mut writer = Writer::new(Vec::new());

        writer
            .create_element("row")
            .with_attribute(("r", row_num.to_string().as_str()))
            .write_inner_content(|w| {
                for (idx, val) in cells.iter().enumerate() {
                    let coord = format!("{}{}", col_letters(idx), row_num);
                    let mut c_elem = w.create_element("c").with_attribute(("r", coord.as_str()));
                    if let Some(t) = val.type_attr() {
                        c_elem = c_elem.with_attribute(("t", t));
                    }
                    c_elem.write_inner_content(|w2| {
                        match val {
                            CellValue::Text(s) => {
                                w2.create_element("is").write_inner_content(|w3| {
                                    w3.create_element("t")
                                        .write_text_content(BytesText::new(s))?;
                                    Ok(())
                                })?;
                            }
                            other => {
                                let raw = other.raw();
                                w2.create_element("v")
                                    .write_text_content(BytesText::new(&raw))?;
                            }
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;

        let new_row_xml = writer.into_inner();

        let pos = self
            .sheet_xml
            .windows(12)
            .rposition(|w| w == b"</sheetData>")
            .ok_or_else(|| TableError::Sheet("</sheetData> tag not found".to_owned()))?;
        self.sheet_xml.splice(pos..pos, new_row_xml);

        debug!("appended row {row_num}");
        Ok(())
    }

    /// Overwrites the cell at `coord` (e.g. "C3") inside an existing row,
    /// keeping the row's cells in column order. The row must already exist.
    pub fn set_cell(&mut self, coord: &str, value: &CellValue) -> Result<()> {
        let digits = coord
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| TableError::Sheet(format!("invalid cell coordinate `{coord}`")))?;
        let row_num: u32 = coord[digits..]
            .parse()
            .map_err(|_| TableError::Sheet(format!("invalid row in coordinate `{coord}`")))?;

        // render the replacement cell
        let mut cell_writer = Writer::new(Vec::new());
        let mut c_elem = cell_writer.create_element("c").with_attribute(("r", coord));
        if let Some(t) = value.type_attr() {
            c_elem = c_elem.with_attribute(("t", t));
        }
        c_elem.write_inner_content(|w| {
            match value {
                CellValue::Text(s) => {
                    w.create_element("is").write_inner_content(|w2| {
                        w2.create_element("t")
                            .write_text_content(BytesText::new(s))?;
                        Ok(())
                    })?;
                }
                other => {
                    let raw = other.raw();
                    w.create_element("v").write_text_content(BytesText::new(&raw))?;
                }
            }
            Ok(())
        })?;
        let cell_xml = cell_writer.into_inner();

        let row_marker = format!("<row r=\"{row_num}\"");
        let row_start = find_bytes(&self.sheet_xml, row_marker.as_bytes())
            .ok_or_else(|| TableError::Sheet(format!("row {row_num} not found")))?;
        let rel_end = find_bytes(&self.sheet_xml[row_start..], b"</row>")
            .ok_or_else(|| TableError::Sheet("</row> not found".to_owned()))?;
        let row_end = row_start + rel_end + "</row>".len();
        let mut row_slice = self.sheet_xml[row_start..row_end].to_vec();

        // drop the existing cell, if any
        let cell_marker = format!("<c r=\"{coord}\"");
        if let Some(cell_pos) = find_bytes(&row_slice, cell_marker.as_bytes()) {
            let tag_end = find_bytes(&row_slice[cell_pos..], b">")
                .ok_or_else(|| TableError::Sheet(format!("malformed cell `{coord}`")))?;
            let end = if row_slice[cell_pos + tag_end - 1] == b'/' {
                cell_pos + tag_end + 1
            } else {
                let close = find_bytes(&row_slice[cell_pos..], b"</c>")
                    .ok_or_else(|| TableError::Sheet(format!("unterminated cell `{coord}`")))?;
                cell_pos + close + "</c>".len()
            };
            row_slice.drain(cell_pos..end);
        }

        // insert so the row stays sorted by column
        let target_col = col_number(coord);
        let mut insert_pos = row_slice.len() - "</row>".len();
        let mut i = 0;
        while let Some(c_pos) = find_bytes(&row_slice[i..], b"<c r=\"") {
            let abs = i + c_pos;
            match row_slice[abs + 6..].iter().position(|&b| b == b'"') {
                Some(end_quote) => {
                    let coord_bytes = &row_slice[abs + 6..abs + 6 + end_quote];
                    if let Ok(existing) = std::str::from_utf8(coord_bytes) {
                        if col_number(existing) > target_col {
                            insert_pos = abs;
                            break;
                        }
                    }
                    i = abs + 6 + end_quote;
                }
                None => break,
            }
        }
        row_slice.splice(insert_pos..insert_pos, cell_xml);

        self.sheet_xml.splice(row_start..row_end, row_slice);

        debug!("set cell {coord}");
        Ok(())
    }

    /// Re-zips the source package with the edited worksheet substituted,
    /// writing to a temporary file next to `dst` and renaming over it.
    pub fn save<P: AsRef<Path>>(&self, dst: P) -> Result<()> {
        let dst = dst.as_ref();
        let mut zin = ZipArchive::new(fs::File::open(&self.src_path)?)?;

        let dir = dst
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut zout = ZipWriter::new(&mut tmp);
            let opt: FileOptions<'_, ()> = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644);

            for i in 0..zin.len() {
                let mut f = zin.by_index(i)?;
                let name = f.name();
                if name == crate::SHEET_PART {
                    zout.start_file::<_, ()>(name, opt)?;
                    zout.write_all(&self.sheet_xml)?;
                } else {
                    zout.start_file::<_, ()>(name, opt)?;
                    std::io::copy(&mut f, &mut zout)?;
                }
            }
            zout.finish()?;
        }
        fs::rename(tmp.path(), dst)?;

        debug!("saved {}", dst.display());
        Ok(())
    }
}

/// Last `<row r="N">` number in the sheet, 0 when there are no rows.
fn calc_last_row(sheet_xml: &[u8]) -> u32 {
    let mut reader = Reader::from_reader(sheet_xml);
    reader.config_mut().trim_text(true);

    let mut last_row = 0u32;
    while let Ok(ev) = reader.read_event() {
        match ev {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"row" => {
                if let Some(r) = e.attributes().with_checks(false).flatten().find_map(|a| {
                    (a.key.as_ref() == b"r").then(|| String::from_utf8_lossy(&a.value).into_owned())
                }) {
                    last_row = r.parse::<u32>().unwrap_or(last_row);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    last_row
}

fn find_bytes(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}
