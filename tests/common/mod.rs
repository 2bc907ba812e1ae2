// Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use geo::{polygon, MultiPolygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};

pub fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
    ]])
}

/// One attribute column of a `.dbf` file.
pub enum Column<'a> {
    Text(&'a str, Vec<&'a str>),
    Number(&'a str, Vec<f64>),
}

impl Column<'_> {
    fn name(&self) -> &str {
        match self { Column::Text(name, _) | Column::Number(name, _) => name }
    }

    fn value(&self, row: usize) -> FieldValue {
        match self {
            Column::Text(_, values) => FieldValue::Character(Some(values[row].to_string())),
            Column::Number(_, values) => FieldValue::Numeric(Some(values[row])),
        }
    }
}

/// Write `<dir>/<stem>.{shp,shx,dbf}` with one polygon per ring (and `.prj` when given);
/// returns the `.shp` path.
pub fn write_shapefile(dir: &Path, stem: &str, records: &[Vec<(f64, f64)>], columns: &[Column<'_>], prj: Option<&str>) -> PathBuf {
    let shp = dir.join(format!("{stem}.shp"));
    let table = columns.iter().fold(TableWriterBuilder::new(), |table, column| {
        let name = FieldName::try_from(column.name()).unwrap();
        match column {
            Column::Text(..) => table.add_character_field(name, 16),
            Column::Number(..) => table.add_numeric_field(name, 12, 4),
        }
    });

    let mut writer = shapefile::Writer::from_path(&shp, table).unwrap();
    for (row, ring) in records.iter().enumerate() {
        let points = ring.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let mut record = Record::default();
        for column in columns {
            record.insert(column.name().to_string(), column.value(row));
        }
        writer.write_shape_and_record(&Polygon::new(PolygonRing::Outer(points)), &record).unwrap();
    }
    drop(writer);

    if let Some(wkt) = prj {
        std::fs::write(dir.join(format!("{stem}.prj")), wkt).unwrap();
    }
    shp
}

/// Zip every file of `dir` (non-recursively) under `prefix/` into `zip_path`.
pub fn zip_dir(dir: &Path, prefix: &str, zip_path: &Path) {
    let mut writer = zip::ZipWriter::new(std::fs::File::create(zip_path).unwrap());
    let mut entries: Vec<_> = std::fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
    entries.sort();
    for path in entries.into_iter().filter(|p| p.is_file()) {
        let name = format!("{prefix}/{}", path.file_name().unwrap().to_string_lossy());
        writer.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(&std::fs::read(&path).unwrap()).unwrap();
    }
    writer.finish().unwrap();
}

/// Clockwise square ring starting at the south-west corner.
pub fn clockwise_square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    vec![(x, y), (x, y + size), (x + size, y + size), (x + size, y), (x, y)]
}
