use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Convert slope rasters and boundary shapefiles into polygon datasets and extract from them
#[derive(Parser, Debug)]
#[command(name = "geoextract", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Region configuration (JSON); defaults to Rwanda
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Dataset store directory
    #[arg(long, global = true, default_value = "geoextract-store", value_hint = ValueHint::DirPath)]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Vectorize a single-band GeoTIFF into slope polygons
    ConvertRaster(ConvertArgs),

    /// Ingest a shapefile bundle (.zip, directory or .shp)
    ConvertShapefile(ConvertArgs),

    /// Import an existing GeoJSON FeatureCollection
    ImportGeojson(ConvertArgs),

    /// Extract features by bounding box (or all) with area-weighted statistics
    Extract(ExtractArgs),

    /// List stored datasets
    List,

    /// Print a stored dataset's metadata
    Show(DatasetArgs),

    /// Write a stored dataset as a GeoJSON FeatureCollection (forbids stdout)
    Export(ExportArgs),

    /// Remove a stored dataset
    Delete(DatasetArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input file
    #[arg(value_hint = ValueHint::AnyPath)]
    pub input: PathBuf,

    /// Dataset type label
    #[arg(long, default_value = "slope")]
    pub data_type: String,

    #[arg(long)]
    pub year: Option<i32>,

    /// Free-form dataset name
    #[arg(long)]
    pub name: Option<String>,

    /// Simplification tolerance in degrees
    #[arg(long)]
    pub simplify_tolerance: Option<f64>,

    /// Stop after this many polygons (rasters only)
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Source CRS, used when the input does not look like lon/lat in the region
    #[arg(long)]
    pub force_epsg: Option<u32>,

    /// Keep features outside the region boundary
    #[arg(long)]
    pub no_clip: bool,

    /// Round raster values to multiples of this step before polygonizing
    #[arg(long)]
    pub quantize_step: Option<f64>,

    /// Tag every feature with the district/sector containing its centroid
    #[arg(long)]
    pub add_region_tags: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Dataset upload id
    pub upload_id: String,

    /// Query rectangle; all features when omitted
    #[arg(long, num_args = 4, value_names = ["MIN_LON", "MIN_LAT", "MAX_LON", "MAX_LAT"], allow_negative_numbers = true)]
    pub bbox: Option<Vec<f64>>,

    #[arg(long)]
    pub district: Option<String>,

    #[arg(long)]
    pub sector: Option<String>,

    /// Year label; defaults to the dataset's year
    #[arg(long)]
    pub year: Option<i32>,

    /// CRS of the stored features when the dataset is not in EPSG:4326
    #[arg(long)]
    pub source_epsg: Option<u32>,

    /// Write Elasticsearch bulk NDJSON into this directory
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub search_out: Option<PathBuf>,

    /// Write the result table as CSV into this directory
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub table_out: Option<PathBuf>,

    /// Append to existing sink outputs instead of replacing them
    #[arg(long)]
    pub append: bool,

    /// Write the result JSON here instead of stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    pub upload_id: String,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub upload_id: String,

    /// Output GeoJSON file ("-" is rejected)
    #[arg(value_hint = ValueHint::FilePath)]
    pub out: PathBuf,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}
