//! A Rust library for reading MHC class II binding predictions produced by
//! NetMHCIIpan and ranking alleles by the epitopes predicted to bind them
pub mod allele;
mod dataset;
pub mod parser;
mod protein;
pub mod ranking;
mod util;

pub use dataset::{build, build_from_files, discover, Dataset, LoadError, ProteinEntry, ResultFile};
pub use parser::{Error, ErrorKind, Parser};
pub use protein::{AlleleBinderSummary, EpitopePrediction, Protein, ProteinDefError, ProteinTable};

/// Parse a string containing the output of a single NetMHCIIpan run for
/// alleles of `family` into a `ProteinTable`
pub fn read_netmhcii(input: &str, family: &str) -> Result<ProteinTable, Error> {
    parser::parse(input.lines(), family)
}
