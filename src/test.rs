use std::io::Read;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::tempdir;
use zip::ZipArchive;

use crate::cell::CellValue;
use crate::editor::SheetEditor;
use crate::error::TableError;
use crate::ops::{self, RunConfig};
use crate::reader::SheetReader;
use crate::writer::TableWriter;

fn cfg_in(dir: &Path) -> RunConfig {
    RunConfig::new(dir.join("example.xlsx"))
}

fn collect(cfg: &RunConfig) -> Result<Vec<Vec<CellValue>>> {
    let rows = ops::load(cfg)?.collect::<crate::Result<Vec<_>>>()?;
    Ok(rows)
}

#[test]
fn write_then_read_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;

    let rows = collect(&cfg)?;
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        vec![
            CellValue::Text("Name".into()),
            CellValue::Text("Age".into()),
            CellValue::Text("City".into()),
            CellValue::Text("Date".into()),
        ]
    );

    assert_eq!(rows[1][0], CellValue::Text("Alice".into()));
    assert_eq!(rows[1][1], CellValue::Int(30));
    assert_eq!(rows[1][2], CellValue::Text("New York".into()));
    assert!(matches!(rows[1][3], CellValue::Timestamp(_)));

    assert_eq!(rows[2][0], CellValue::Text("Bob".into()));
    assert_eq!(rows[2][1], CellValue::Int(25));
    assert_eq!(rows[2][2], CellValue::Text("San Francisco".into()));

    assert_eq!(rows[3][0], CellValue::Text("Charlie".into()));
    assert_eq!(rows[3][1], CellValue::Int(35));
    assert_eq!(rows[3][2], CellValue::Text("Boston".into()));
    Ok(())
}

#[test]
fn update_appends_one_row_and_rewrites_one_city() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;
    let before = collect(&cfg)?;

    ops::append_and_mutate(&cfg)?;
    let after = collect(&cfg)?;

    assert_eq!(after.len(), 5);
    assert_eq!(after[4][0], CellValue::Text("David".into()));
    assert_eq!(after[4][1], CellValue::Int(28));
    assert_eq!(after[4][2], CellValue::Text("Chicago".into()));
    assert!(matches!(after[4][3], CellValue::Timestamp(_)));

    // only Bob's city changed
    assert_eq!(after[2][2], CellValue::Text("Los Angeles".into()));
    assert_eq!(after[2][0], before[2][0]);
    assert_eq!(after[2][1], before[2][1]);
    assert_eq!(after[2][3], before[2][3]);

    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
    assert_eq!(after[3], before[3]);
    Ok(())
}

#[test]
fn missing_file_is_reported_and_not_created() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());

    assert!(matches!(ops::load(&cfg), Err(TableError::NotFound(_))));
    assert!(matches!(
        ops::append_and_mutate(&cfg),
        Err(TableError::NotFound(_))
    ));
    assert!(!cfg.path.exists());
    Ok(())
}

#[test]
fn dry_run_never_touches_disk() -> Result<()> {
    let dir = tempdir()?;
    let mut cfg = cfg_in(dir.path());

    cfg.dry_run = true;
    ops::create(&cfg)?;
    assert!(!cfg.path.exists());

    cfg.dry_run = false;
    ops::create(&cfg)?;
    cfg.dry_run = true;
    ops::append_and_mutate(&cfg)?;

    cfg.dry_run = false;
    assert_eq!(collect(&cfg)?.len(), 4);
    Ok(())
}

#[test]
fn set_cell_replaces_a_single_cell() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;

    let mut editor = SheetEditor::open(&cfg.path)?;
    editor.set_cell("B2", &CellValue::Int(31))?;
    editor.save(&cfg.path)?;

    let rows = collect(&cfg)?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][1], CellValue::Int(31));
    assert_eq!(rows[1][0], CellValue::Text("Alice".into()));
    assert_eq!(rows[1][2], CellValue::Text("New York".into()));
    Ok(())
}

#[test]
fn set_cell_rejects_a_missing_row() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;

    let mut editor = SheetEditor::open(&cfg.path)?;
    assert!(matches!(
        editor.set_cell("C9", &CellValue::Int(1)),
        Err(TableError::Sheet(_))
    ));
    Ok(())
}

#[test]
fn date_cells_round_trip_to_the_second() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("dates.xlsx");
    let stamp = NaiveDate::from_ymd_opt(2024, 5, 17)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();

    let mut writer = TableWriter::new("Data");
    writer.header(["Name", "Age", "City", "Date"]);
    writer.append_row(vec!["Eve".into(), 41.into(), "Austin".into(), stamp.into()]);
    writer.save(&path)?;

    let rows = SheetReader::open(&path)?
        .rows()
        .collect::<crate::Result<Vec<_>>>()?;
    assert_eq!(rows[1][3], CellValue::Timestamp(stamp));
    Ok(())
}

#[test]
fn workbook_package_is_complete() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;

    let mut zip = ZipArchive::new(std::fs::File::open(&cfg.path)?)?;
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(zip.by_name(part).is_ok(), "{part} missing");
    }

    let mut sheet = String::new();
    zip.by_name("xl/worksheets/sheet1.xml")?
        .read_to_string(&mut sheet)?;
    assert!(sheet.contains(r#"<col min="1" max="1" width="15" customWidth="1"/>"#));
    assert!(sheet.contains(r#"s="1""#), "header cells not styled");
    Ok(())
}

#[test]
fn appended_rows_continue_the_row_numbering() -> Result<()> {
    let dir = tempdir()?;
    let cfg = cfg_in(dir.path());
    ops::create(&cfg)?;

    let editor = SheetEditor::open(&cfg.path)?;
    assert_eq!(editor.last_row(), 4);

    ops::append_and_mutate(&cfg)?;
    let editor = SheetEditor::open(&cfg.path)?;
    assert_eq!(editor.last_row(), 5);
    Ok(())
}
