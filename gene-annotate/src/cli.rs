use clap::{ArgAction, Parser};
use config::{
    ArgCheck, CliError, Delimiter, DATAFORMAT, DATASETS, DEFAULT_GENE_COLUMN, DEFAULT_TAXON,
};
use gene_lookup::LookupType;
use std::path::PathBuf;

use crate::reconcile::Policy;

#[derive(Debug, Parser)]
#[command(version, about = "Annotate a gene table with NCBI gene records", long_about = None)]
pub struct Args {
    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATH",
        help = "Path to the delimited gene table [.txt, .tsv, .csv, .tab]"
    )]
    pub input: PathBuf,

    #[arg(
        short = 'c',
        long = "column",
        value_name = "NAME",
        default_value = DEFAULT_GENE_COLUMN,
        help = "Column holding the gene symbols"
    )]
    pub column: String,

    #[arg(
        short = 'o',
        long = "outdir",
        required = false,
        value_name = "PATH",
        help = "Output directory path [defaults to the input directory]"
    )]
    pub outdir: Option<PathBuf>,

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
        short = 'p',
        long = "policy",
        value_name = "POLICY",
        default_value = "all",
        help = "Reconciliation policy [all: GO terms from every returned row, strict: only exact symbol matches]"
    )]
    pub policy: String,

    #[arg(
        short = 'd',
        long = "delimiter",
        value_name = "DELIMITER",
        default_value = "tab",
        help = "Delimiter of the gene table [tab, comma]"
    )]
    pub delimiter: String,

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

    #[arg(
        long = "keep-raw",
        help = "Flag to write every raw lookup response",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub keep_raw: bool,

    #[arg(
        long = "descriptor",
        help = "Flag to write a per-gene descriptor table",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub descriptor: bool,
}

impl ArgCheck for Args {
    fn check_options(&self) -> Result<(), CliError> {
        self.policy()?;
        self.lookup_type()?;
        self.delimiter()?;
        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        vec![&self.input]
    }
}

impl Args {
    pub fn policy(&self) -> Result<Policy, CliError> {
        self.policy.parse()
    }

    pub fn lookup_type(&self) -> Result<LookupType, CliError> {
        self.lookup_type.parse()
    }

    pub fn delimiter(&self) -> Result<Delimiter, CliError> {
        self.delimiter.parse()
    }

    pub fn outdir(&self) -> PathBuf {
        match &self.outdir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
