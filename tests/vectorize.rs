// Integration tests for raster vectorization:
//   4x4 quadrant scenario, truncation flag, clipping, quantization,
//   NoValidData, and GeoTIFF georeferencing/nodata/GeoKey decoding.

use std::path::Path;

use geo::{coord, Area, BoundingRect, MultiPolygon, Rect};
use ndarray::{array, Array2};
use serde_json::json;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use geoextract::config::{ConversionOptions, RegionConfig};
use geoextract::dataset::SourceKind;
use geoextract::raster::{read_geotiff, GeoTransform, Raster, RasterVectorizer};
use geoextract::region::{boundaries_from_geojson, RegionIndex};
use geoextract::{DatasetInfo, Error, FeatureStore, MemStore, Region};

const PIXEL: f64 = 0.01;
/// Roughly 30 m at Kigali's latitude.
const FINE: f64 = 0.00027;

fn region() -> Region {
    Region::from_parts(RegionConfig::default(), None, None, None)
}

fn info() -> DatasetInfo {
    DatasetInfo { data_type: "slope".to_string(), year: Some(2024), name: Some("kigali".to_string()) }
}

fn exact() -> ConversionOptions {
    ConversionOptions { simplify_tolerance: 0.0, clip_to_region: false, ..ConversionOptions::default() }
}

/// Four 2x2 blocks valued 1 (top-left), 2 (top-right), 3 (bottom-left), 4 (bottom-right).
fn quadrants() -> Array2<f64> {
    array![
        [1.0, 1.0, 2.0, 2.0],
        [1.0, 1.0, 2.0, 2.0],
        [3.0, 3.0, 4.0, 4.0],
        [3.0, 3.0, 4.0, 4.0],
    ]
}

fn kigali_raster(data: Array2<f64>) -> Raster {
    Raster::new(data, GeoTransform::new(30.0, -1.9, PIXEL, -PIXEL), None).with_epsg(4326)
}

#[test]
fn quadrants_become_four_squares() {
    let region = region();
    let dataset = RasterVectorizer::new(&region)
        .vectorize(&kigali_raster(quadrants()), None, info(), &exact())
        .unwrap();

    assert_eq!(dataset.len(), 4);
    assert!(!dataset.metadata.truncated);
    assert_eq!(dataset.metadata.source, SourceKind::Raster);
    assert_eq!(dataset.metadata.crs_note, "EPSG:4326 from GeoTIFF keys");

    let values: Vec<f64> = dataset.features.iter().map(|f| f.attributes.slope_value.unwrap()).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    for feature in &dataset.features {
        assert!((feature.geometry.unsigned_area() - 4.0 * PIXEL * PIXEL).abs() < 1e-9);
    }

    let top_left = dataset.features[0].geometry.bounding_rect().unwrap();
    assert!((top_left.min().x - 30.0).abs() < 1e-9);
    assert!((top_left.max().x - 30.02).abs() < 1e-9);
    assert!((top_left.min().y + 1.92).abs() < 1e-9);
    assert!((top_left.max().y + 1.90).abs() < 1e-9);

    let ids: Vec<&str> = dataset.features.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3"]);
    let raster = dataset.metadata.raster.as_ref().unwrap();
    assert_eq!((raster.width, raster.height, raster.valid_cells), (4, 4, 16));
    let bounds = dataset.metadata.bounds.unwrap();
    for (got, want) in bounds.iter().zip([30.0, -1.94, 30.04, -1.9]) {
        assert!((got - want).abs() < 1e-9, "bounds {bounds:?}");
    }
}

#[test]
fn truncation_flag_means_regions_were_left() {
    let region = region();
    let vectorizer = RasterVectorizer::new(&region);
    let raster = kigali_raster(quadrants());

    let capped = ConversionOptions { max_features: 2, ..exact() };
    let dataset = vectorizer.vectorize(&raster, None, info(), &capped).unwrap();
    assert_eq!(dataset.len(), 2);
    assert!(dataset.metadata.truncated);
    assert_eq!(dataset.metadata.max_features, Some(2));

    let exact_fit = ConversionOptions { max_features: 4, ..exact() };
    let dataset = vectorizer.vectorize(&raster, None, info(), &exact_fit).unwrap();
    assert_eq!(dataset.len(), 4);
    assert!(!dataset.metadata.truncated);
}

#[test]
fn clip_keeps_cells_whose_centres_are_inside() {
    let region = region();
    let left_half = MultiPolygon::new(vec![
        Rect::new(coord! { x: 29.99, y: -1.95 }, coord! { x: 30.02, y: -1.89 }).to_polygon(),
    ]);
    let dataset = RasterVectorizer::new(&region)
        .vectorize(&kigali_raster(quadrants()), Some(&left_half), info(), &exact())
        .unwrap();

    let values: Vec<f64> = dataset.features.iter().map(|f| f.attributes.slope_value.unwrap()).collect();
    assert_eq!(values, vec![1.0, 3.0]);
    assert!(dataset.metadata.clipped);
    assert_eq!(dataset.metadata.raster.as_ref().unwrap().valid_cells, 8);
}

#[test]
fn clip_outside_the_raster_has_no_valid_data() {
    let region = region();
    let elsewhere = MultiPolygon::new(vec![
        Rect::new(coord! { x: 29.0, y: -2.5 }, coord! { x: 29.1, y: -2.4 }).to_polygon(),
    ]);
    let err = RasterVectorizer::new(&region)
        .vectorize(&kigali_raster(quadrants()), Some(&elsewhere), info(), &exact())
        .unwrap_err();
    assert!(matches!(err, Error::NoValidData));
}

#[test]
fn all_nodata_has_no_valid_data() {
    let region = region();
    let raster = Raster::new(Array2::from_elem((3, 3), -9999.0), GeoTransform::new(30.0, -1.9, PIXEL, -PIXEL), Some(-9999.0))
        .with_epsg(4326);
    let err = RasterVectorizer::new(&region).vectorize(&raster, None, info(), &exact()).unwrap_err();
    assert!(matches!(err, Error::NoValidData));
}

#[test]
fn quantization_merges_close_values() {
    let region = region();
    let data = array![[1.2, 1.4], [0.9, 7.6]];
    let options = ConversionOptions { quantize_step: Some(1.0), ..exact() };
    let dataset = RasterVectorizer::new(&region)
        .vectorize(&kigali_raster(data), None, info(), &options)
        .unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.features[0].attributes.slope_value, Some(1.0));
    assert!((dataset.features[0].geometry.unsigned_area() - 3.0 * PIXEL * PIXEL).abs() < 1e-9);
    assert_eq!(dataset.features[1].attributes.slope_value, Some(8.0));
    assert_eq!(dataset.metadata.quantize_step, Some(1.0));
}

/// 20x20 fine cells in 2x2 blocks, each block its own value: 100 small regions.
fn fine_blocks() -> Raster {
    let data = Array2::from_shape_fn((20, 20), |(r, c)| (10 * (r / 2) + c / 2) as f64);
    Raster::new(data, GeoTransform::new(30.1, -1.9, FINE, -FINE), None).with_epsg(4326)
}

fn default_unclipped() -> ConversionOptions {
    ConversionOptions { clip_to_region: false, ..ConversionOptions::default() }
}

#[test]
fn small_regions_survive_the_default_tolerance() {
    let region = region();
    let options = default_unclipped();
    assert!(options.simplify_tolerance > 2.0 * FINE);
    let dataset = RasterVectorizer::new(&region).vectorize(&fine_blocks(), None, info(), &options).unwrap();

    assert_eq!(dataset.len(), 100);
    assert!(dataset.metadata.skipped.is_empty());
    let total: f64 = dataset.features.iter().map(|f| f.geometry.unsigned_area()).sum();
    assert!((total - 400.0 * FINE * FINE).abs() < 1e-12);
}

#[test]
fn tagged_regions_carry_their_district_through_the_store() {
    let districts = boundaries_from_geojson(&json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "district": "Gasabo" },
            "geometry": { "type": "Polygon", "coordinates": [[[30.0, -2.0], [30.3, -2.0], [30.3, -1.7], [30.0, -1.7], [30.0, -2.0]]] },
        }],
    }), "district").unwrap();
    let region = Region::from_parts(RegionConfig::default(), None, Some(RegionIndex::build(districts)), None);
    let options = ConversionOptions { add_region_tags: true, ..default_unclipped() };
    let dataset = RasterVectorizer::new(&region).vectorize(&fine_blocks(), None, info(), &options).unwrap();

    assert!(dataset.metadata.region_tagging);
    assert!(dataset.features.iter().all(|f| f.attributes.district.as_deref() == Some("Gasabo")));
    assert!(dataset.features.iter().all(|f| f.attributes.sector.is_none()));

    let mut store = MemStore::default();
    let id = store.put(&dataset).unwrap();
    assert_eq!(store.get(&id).unwrap(), dataset);
}

#[test]
fn projected_raster_without_keys_is_detected_from_its_centre() {
    let to_utm = geoextract::crs::Transformer::from_wgs84(32736).unwrap();
    let (x, y) = to_utm.transform_xy(30.06, -1.95).unwrap();
    let raster = Raster::new(quadrants(), GeoTransform::new(x, y, 30.0, -30.0), None);

    let region = region();
    let dataset = RasterVectorizer::new(&region).vectorize(&raster, None, info(), &exact()).unwrap();
    assert_eq!(dataset.metadata.source_epsg, 32736);
    assert_eq!(dataset.len(), 4);
    // The grid's top-left corner sits on (30.06, -1.95).
    let [min_lon, _, _, max_lat] = dataset.metadata.bounds.unwrap();
    assert!((min_lon - 30.06).abs() < 1e-4 && (max_lat + 1.95).abs() < 1e-4);
}

fn write_geotiff(path: &Path, data: &[f32], width: u32, height: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray32Float>(width, height).unwrap();
    let dir = image.encoder();
    dir.write_tag(Tag::Unknown(33550), &[PIXEL, PIXEL, 0.0][..]).unwrap();
    dir.write_tag(Tag::Unknown(33922), &[0.0, 0.0, 0.0, 30.0, -1.9, 0.0][..]).unwrap();
    dir.write_tag(Tag::Unknown(34735), &[1u16, 1, 0, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326][..]).unwrap();
    dir.write_tag(Tag::Unknown(42113), "-9999").unwrap();
    image.write_data(data).unwrap();
}

#[test]
fn geotiff_is_read_with_georeferencing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slope.tif");
    let mut values: Vec<f32> = quadrants().iter().map(|&v| v as f32).collect();
    values[15] = -9999.0;
    write_geotiff(&path, &values, 4, 4);

    let raster = read_geotiff(&path).unwrap();
    assert_eq!((raster.width(), raster.height()), (4, 4));
    assert_eq!(raster.epsg, Some(4326));
    assert_eq!(raster.nodata, Some(-9999.0));
    assert_eq!(raster.valid_count(), 15);
    assert_eq!(raster.transform, GeoTransform::new(30.0, -1.9, PIXEL, -PIXEL));

    let region = region();
    let dataset = RasterVectorizer::new(&region).vectorize(&raster, None, info(), &exact()).unwrap();
    assert_eq!(dataset.len(), 4);
    let last = dataset.features.last().unwrap();
    assert_eq!(last.attributes.slope_value, Some(4.0));
    assert!((last.geometry.unsigned_area() - 3.0 * PIXEL * PIXEL).abs() < 1e-9);
}

#[test]
fn non_tiff_is_an_invalid_raster() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.tif");
    std::fs::write(&path, b"not a tiff").unwrap();
    assert!(matches!(read_geotiff(&path), Err(Error::InvalidRaster { .. })));
}
