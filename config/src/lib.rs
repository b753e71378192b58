//! Universal constants and helpers shared by the genotools binaries.
//!
//! Every tool in the workspace reads its defaults, output names and
//! folder layout from here, so the layout of a run directory stays the
//! same regardless of which tool produced it.

mod fns;
pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// lookup defaults
pub const DEFAULT_TAXON: &str = "human";
pub const DEFAULT_GENE_COLUMN: &str = "Gene_Symbol";
pub const DATASETS: &str = "datasets";
pub const DATAFORMAT: &str = "dataformat";

// reduction
pub const VALUE_SEPARATOR: &str = ";";

// folder names
pub const MULTIPLE_GENE_MATCHES: &str = "multiple-gene-matches";
pub const MULTIPLE_VALUES: &str = "multiple-values";
pub const RAW_RESPONSES: &str = "raw-responses";

// file names
pub const ANNOTATE_SUFFIX: &str = "_annotate";
pub const STRICT_SUFFIX: &str = "_strict";
pub const DESCRIPTOR_SUFFIX: &str = "_descriptor";
pub const TABLE_EXTENSION: &str = "txt";
pub const TABLE_EXTENSIONS: [&str; 4] = ["txt", "tsv", "csv", "tab"];

// cells read as missing when parsing tool output
pub const MISSING_MARKERS: [&str; 12] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);
