pub mod cli;
pub mod core;
pub mod record;

pub use crate::core::{Datasets, GeneLookup, LookupError, LookupType};
pub use record::*;
