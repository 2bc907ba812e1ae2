mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::convert::Input;
use commands::{convert, datasets, extract, init_logging};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::ConvertRaster(args) => convert::run(&cli, args, Input::Raster),
        Commands::ConvertShapefile(args) => convert::run(&cli, args, Input::Shapefile),
        Commands::ImportGeojson(args) => convert::run(&cli, args, Input::Geojson),
        Commands::Extract(args) => extract::run(&cli, args),
        Commands::List => datasets::list(&cli),
        Commands::Show(args) => datasets::show(&cli, args),
        Commands::Export(args) => datasets::export(&cli, args),
        Commands::Delete(args) => datasets::delete(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
