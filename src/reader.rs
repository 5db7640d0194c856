//! Streaming read of the worksheet.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::cell::{Row, parse_cell};
use crate::error::{Result, TableError, open_existing};

/// Holds the extracted worksheet part of an existing workbook.
pub struct SheetReader {
    sheet_xml: Vec<u8>,
}

impl SheetReader {
    /// Opens the workbook at `path`. A missing file fails with
    /// [`TableError::NotFound`] and never creates anything on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut zip = ZipArchive::new(open_existing(path)?)?;

        let sheet_xml: Vec<u8> = {
            let mut sheet = zip.by_name(crate::SHEET_PART).map_err(|_| {
                TableError::Sheet(format!("{} missing from archive", crate::SHEET_PART))
            })?;
            let mut buf = Vec::with_capacity(sheet.size() as usize);
            sheet.read_to_end(&mut buf)?;
            buf
        };

        Ok(Self { sheet_xml })
    }

    /// All rows in file order, header included. Consumes the reader: the
    /// returned sequence can be walked exactly once.
    pub fn rows(self) -> Rows {
        Rows::new(self.sheet_xml)
    }
}

/// Lazy iterator over worksheet rows, driven by a `quick-xml` event loop.
pub struct Rows {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    done: bool,
}

impl Rows {
    fn new(sheet_xml: Vec<u8>) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(sheet_xml));
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }
}

fn type_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find_map(|a| (a.key.as_ref() == b"t").then(|| String::from_utf8_lossy(&a.value).into_owned()))
}

impl Iterator for Rows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        if self.done {
            return None;
        }

        let mut cells: Option<Row> = None;
        let mut cell_type: Option<String> = None;
        let mut text: Option<String> = None;
        let mut in_value = false;

        loop {
            self.buf.clear();
            let ev = match self.reader.read_event_into(&mut self.buf) {
                Ok(ev) => ev,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            match ev {
                Event::Start(ref e) => match e.name().as_ref() {
                    b"row" => cells = Some(Row::new()),
                    b"c" => {
                        cell_type = type_attr(e);
                        text = None;
                    }
                    b"v" | b"t" => in_value = true,
                    _ => {}
                },
                Event::Empty(ref e) => match e.name().as_ref() {
                    // a style-only cell carries no payload
                    b"c" => {
                        if let Some(cells) = cells.as_mut() {
                            match parse_cell(type_attr(e).as_deref(), None) {
                                Ok(value) => cells.push(value),
                                Err(e) => {
                                    self.done = true;
                                    return Some(Err(e));
                                }
                            }
                        }
                    }
                    b"row" => return Some(Ok(Row::new())),
                    _ => {}
                },
                Event::Text(ref e) if in_value => {
                    if let Ok(decoded) = e.decode() {
                        if let Ok(t) = quick_xml::escape::unescape(&decoded) {
                            text = Some(t.into_owned());
                        }
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"c" => {
                        if let Some(cells) = cells.as_mut() {
                            match parse_cell(cell_type.take().as_deref(), text.take().as_deref()) {
                                Ok(value) => cells.push(value),
                                Err(e) => {
                                    self.done = true;
                                    return Some(Err(e));
                                }
                            }
                        }
                    }
                    b"row" => return Some(Ok(cells.take().unwrap_or_default())),
                    _ => {}
                },
                Event::Eof => {
                    self.done = true;
                    return None;
                }
                _ => {}
            }
        }
    }
}
