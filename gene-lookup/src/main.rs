//! Ad hoc NCBI gene lookups
//! Alejandro Gonzales-Irribarren, 2025
//!
//! Queries the NCBI `datasets` tool once per gene and writes every
//! returned row, under a single header, to one table. Useful to inspect
//! what the annotation step will see for a handful of genes before
//! running it on a whole worklist.

use clap::Parser;
use config::{show_time, ArgCheck};
use log::{error, info, Level};
use simple_logger::init_with_level;

use gene_lookup::{cli::Args, core::lookup_genes};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let output = args.output.clone();
    let rows = lookup_genes(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    info!("Wrote {} rows to {:?}", rows, output);
    info!("Elapsed time: {}", show_time(start.elapsed()));
}
