use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fmt;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::{MISSING_MARKERS, TABLE_EXTENSIONS, TICK_SETTINGS};

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// argument checker for all binaries
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_inputs()?;
        self.check_options()
    }

    fn check_inputs(&self) -> Result<(), CliError> {
        let inputs = self.get_inputs();
        if inputs.is_empty() {
            let err = "ERROR: No input table provided".to_string();
            return Err(CliError::InvalidInput(err));
        }

        for input in inputs {
            validate(input)?;
        }

        Ok(())
    }

    /// hook for option values that clap accepts as plain strings
    fn check_options(&self) -> Result<(), CliError> {
        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf>;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("ERROR: invalid value {value:?} for {param}, the options are: {}", .options.join(", "))]
    InvalidChoice {
        param: String,
        value: String,
        options: Vec<String>,
    },
    #[error("ERROR: column {column:?} not found in {path:?}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Table error: {0}")]
    TableError(#[from] csv::Error),
}

/// argument validation for delimited input tables
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    match arg.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if TABLE_EXTENSIONS.contains(&ext) => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} is not a delimited table [{}]",
                arg,
                TABLE_EXTENSIONS.join(", ")
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

/// check that a value is one of the allowed options
pub fn check_choice(value: &str, options: &[&str], param: &str) -> Result<(), CliError> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(CliError::InvalidChoice {
            param: param.to_string(),
            value: value.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
}

impl Delimiter {
    pub const OPTIONS: [&'static str; 2] = ["tab", "comma"];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }
}

impl FromStr for Delimiter {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_choice(s, &Self::OPTIONS, "--delimiter")?;
        match s {
            "comma" => Ok(Delimiter::Comma),
            _ => Ok(Delimiter::Tab),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => write!(f, "tab"),
            Delimiter::Comma => write!(f, "comma"),
        }
    }
}

/// create `name` inside `parent` if it does not exist yet
pub fn create_folder<P: AsRef<Path>>(parent: P, name: &str) -> Result<PathBuf, CliError> {
    let folder = parent.as_ref().join(name);
    if !folder.is_dir() {
        log::info!("Folder {:?} not found, creating...", folder);
        create_dir_all(&folder)?;
    }

    Ok(folder)
}

/// write a header plus rows to a delimited file, returns the number of rows
pub fn write_table<P, H, R, C>(
    path: P,
    delimiter: Delimiter,
    header: &[H],
    rows: R,
) -> Result<usize, CliError>
where
    P: AsRef<Path>,
    H: AsRef<[u8]>,
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .from_path(path.as_ref())?;

    writer.write_record(header)?;

    let mut count = 0;
    for row in rows {
        writer.write_record(row)?;
        count += 1;
    }
    writer.flush()?;

    log::info!("Rows in {:?}: {}", path.as_ref(), count);
    Ok(count)
}

/// true for empty cells and the usual tabular missing markers
#[inline(always)]
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || MISSING_MARKERS.contains(&cell)
}

/// replace characters that cannot be part of a file name
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// human-readable HH:MM:SS, prefixed with days past 24h
pub fn show_time(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86400;
    let rest = total % 86400;
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);

    if days > 0 {
        format!("{} day(s) {}", days, clock)
    } else {
        clock
    }
}
