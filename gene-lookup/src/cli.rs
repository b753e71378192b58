use clap::Parser;
use config::{ArgCheck, CliError, DATAFORMAT, DATASETS, DEFAULT_TAXON};
use std::path::PathBuf;

use crate::core::LookupType;

#[derive(Debug, Parser)]
#[command(version, about = "Raw NCBI gene annotation lookups", long_about = None)]
pub struct Args {
    #[arg(
        short = 'g',
        long = "genes",
        required_unless_present = "file",
        value_name = "SYMBOLS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Gene symbols (or ids) to look up, delimited by comma"
    )]
    pub genes: Vec<String>,

    #[arg(
        short = 'f',
        long = "file",
        required = false,
        value_name = "PATH",
        help = "File with one gene per line [# lines are ignored]"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        value_name = "PATH",
        help = "Path to the output .tsv/.txt table"
    )]
    pub output: PathBuf,

    #[arg(
        short = 'l',
        long = "lookup-type",
        value_name = "TYPE",
        default_value = "symbol",
        help = "Lookup type [symbol, gene-id, accession, taxon]"
    )]
    pub lookup_type: String,

    #[arg(
        short = 'T',
        long = "taxon",
        value_name = "TAXON",
        default_value = DEFAULT_TAXON,
        help = "Taxon filter for symbol lookups"
    )]
    pub taxon: String,

    #[arg(
        long = "datasets",
        value_name = "PATH",
        default_value = DATASETS,
        help = "Path to the NCBI datasets binary"
    )]
    pub datasets: PathBuf,

    #[arg(
        long = "dataformat",
        value_name = "PATH",
        default_value = DATAFORMAT,
        help = "Path to the NCBI dataformat binary"
    )]
    pub dataformat: PathBuf,
}

impl ArgCheck for Args {
    fn check_inputs(&self) -> Result<(), CliError> {
        match &self.file {
            Some(file) if !file.is_file() => Err(CliError::InvalidInput(format!(
                "ERROR: {:?} is not a file",
                file
            ))),
            _ => Ok(()),
        }
    }

    fn check_options(&self) -> Result<(), CliError> {
        self.lookup_type()?;
        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        self.file.iter().collect()
    }
}

impl Args {
    pub fn lookup_type(&self) -> Result<LookupType, CliError> {
        self.lookup_type.parse()
    }
}
