//! From-scratch workbook assembly.
//!
//! Builds every part of a fresh single-sheet package — content types,
//! package/workbook relationships, stylesheet, worksheet — and zips them to
//! the destination path. The fixed parts are string templates; the worksheet
//! is rendered with `quick-xml`.

use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;
use quick_xml::Writer;
use quick_xml::events::BytesText;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cell::{CellValue, Row, col_letters};
use crate::error::Result;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const SHEET_MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#,
);

const RELS_DOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#,
);

/// Cell format index applied to header cells. Format 0 is the default;
/// format 1 is bold white on the header fill.
pub(crate) const HEADER_STYLE_ID: u32 = 1;
const HEADER_FILL_RGB: &str = "FF4472C4";
const HEADER_FONT_RGB: &str = "FFFFFFFF";

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<bookViews><workbookView activeTab="0"/></bookViews>"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>"#,
            r#"</workbook>"#,
        ),
        xml_escape(sheet_name)
    )
}

fn styles_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<fonts count="2">"#,
            r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
            r#"<font><b/><color rgb="{font}"/><sz val="11"/><name val="Calibri"/></font>"#,
            r#"</fonts>"#,
            r#"<fills count="3">"#,
            r#"<fill><patternFill patternType="none"/></fill>"#,
            r#"<fill><patternFill patternType="gray125"/></fill>"#,
            r#"<fill><patternFill patternType="solid"><fgColor rgb="{fill}"/><bgColor indexed="64"/></patternFill></fill>"#,
            r#"</fills>"#,
            r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
            r#"<cellXfs count="2">"#,
            r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
            r#"<xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>"#,
            r#"</cellXfs>"#,
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
            r#"</styleSheet>"#,
        ),
        font = HEADER_FONT_RGB,
        fill = HEADER_FILL_RGB,
    )
}

/// Accumulates a header row, data rows and column widths, then writes a
/// complete workbook. The header row always carries the header format.
pub struct TableWriter {
    sheet_name: String,
    header: Row,
    rows: Vec<Row>,
    column_widths: Vec<f64>,
}

impl TableWriter {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            header: Row::new(),
            rows: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    pub fn header<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = labels
            .into_iter()
            .map(|l| CellValue::Text(l.into()))
            .collect();
        self
    }

    pub fn append_row(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn column_widths<I>(&mut self, widths: I) -> &mut Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.column_widths = widths.into_iter().collect();
        self
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders `xl/worksheets/sheet1.xml`: a `<cols>` block when widths were
    /// given, then the header row (format 1) and every data row.
    fn sheet_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer
            .create_element("worksheet")
            .with_attribute(("xmlns", SHEET_MAIN_NS))
            .write_inner_content(|w| {
                if !self.column_widths.is_empty() {
                    w.create_element("cols").write_inner_content(|wc| {
                        for (idx, width) in self.column_widths.iter().enumerate() {
                            let num = (idx as u32 + 1).to_string();
                            let width = width.to_string();
                            wc.create_element("col")
                                .with_attribute(("min", num.as_str()))
                                .with_attribute(("max", num.as_str()))
                                .with_attribute(("width", width.as_str()))
                                .with_attribute(("customWidth", "1"))
                                .write_empty()?;
                        }
                        Ok(())
                    })?;
                }

                w.create_element("sheetData").write_inner_content(|ws| {
                    let style_attr = HEADER_STYLE_ID.to_string();
                    let mut row_num = 0u32;
                    for (row, styled) in std::iter::once((&self.header, true))
                        .chain(self.rows.iter().map(|r| (r, false)))
                    {
                        if row.is_empty() {
                            continue;
                        }
                        row_num += 1;
                        let r = row_num.to_string();
                        ws.create_element("row")
                            .with_attribute(("r", r.as_str()))
                            .write_inner_content(|wr| {
                                for (idx, val) in row.iter().enumerate() {
                                    let coord = format!("{}{}", col_letters(idx), row_num);
                                    let mut c_elem =
                                        wr.create_element("c").with_attribute(("r", coord.as_str()));
                                    if styled {
                                        c_elem = c_elem.with_attribute(("s", style_attr.as_str()));
                                    }
                                    if let Some(t) = val.type_attr() {
                                        c_elem = c_elem.with_attribute(("t", t));
                                    }
                                    c_elem.write_inner_content(|wc| {
                                        match val {
                                            CellValue::Text(s) => {
                                                wc.create_element("is").write_inner_content(
                                                    |wt| {
                                                        wt.create_element("t")
                                                            .write_text_content(BytesText::new(s))?;
                                                        Ok(())
                                                    },
                                                )?;
                                            }
                                            other => {
                                                let raw = other.raw();
                                                wc.create_element("v")
                                                    .write_text_content(BytesText::new(&raw))?;
                                            }
                                        }
                                        Ok(())
                                    })?;
                                }
                                Ok(())
                            })?;
                    }
                    Ok(())
                })?;
                Ok(())
            })?;

        let mut xml = XML_DECL.as_bytes().to_vec();
        xml.extend_from_slice(&writer.into_inner());
        Ok(xml)
    }

    /// Writes the workbook. The zip is assembled in a temporary file next to
    /// the destination and renamed over it, so readers never observe a
    /// half-written package.
    pub fn save<P: AsRef<Path>>(&self, dst: P) -> Result<()> {
        let dst = dst.as_ref();
        let sheet_xml = self.sheet_xml()?;

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

            zout.start_file::<_, ()>("[Content_Types].xml", opt)?;
            zout.write_all(CONTENT_TYPES_XML.as_bytes())?;
            zout.start_file::<_, ()>("_rels/.rels", opt)?;
            zout.write_all(RELS_DOT_RELS.as_bytes())?;
            zout.start_file::<_, ()>("xl/workbook.xml", opt)?;
            zout.write_all(workbook_xml(&self.sheet_name).as_bytes())?;
            zout.start_file::<_, ()>("xl/_rels/workbook.xml.rels", opt)?;
            zout.write_all(WORKBOOK_RELS_XML.as_bytes())?;
            zout.start_file::<_, ()>("xl/styles.xml", opt)?;
            zout.write_all(styles_xml().as_bytes())?;
            zout.start_file::<_, ()>(crate::SHEET_PART, opt)?;
            zout.write_all(&sheet_xml)?;
            zout.finish()?;
        }
        fs::rename(tmp.path(), dst)?;

        debug!(
            "wrote sheet '{}' with {} data rows to {}",
            self.sheet_name,
            self.rows.len(),
            dst.display()
        );
        Ok(())
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
