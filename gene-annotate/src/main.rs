//! Gene table annotation with NCBI gene records
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This binary reads a delimited gene table (a microarray export or a
//! plain gene list), looks every gene symbol up with the NCBI `datasets`
//! and `dataformat` tools and appends the reconciled identifier and
//! Gene Ontology columns to the table.
//!
//! In short, every lookup may return several rows: one per GO term and,
//! for ambiguous symbols, rows for other genes. These rows are reduced
//! to a single value per column following the chosen policy ('all' or
//! 'strict'). Genes with several matched symbols or several values for
//! an identifier column get their raw rows written to the
//! 'multiple-gene-matches' and 'multiple-values' folders for review.

use clap::Parser;
use config::{show_time, ArgCheck};
use log::{error, info, Level};
use simple_logger::init_with_level;

use gene_annotate::{cli::Args, core::annotate_genes};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    annotate_genes(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {}", show_time(elapsed));
}
