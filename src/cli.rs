use clap::Parser;
use mhcii_affinity::Protein;
use std::path::PathBuf;

pub const ALL: &str = "all";

#[derive(Debug, Parser)]
#[command(
    name = "mhcii-affinity",
    about = "Summarise NetMHCIIpan predictions for MHC class II alleles",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Args {
    #[arg(
        short = 'p',
        long = "protein",
        required = true,
        help = "Protein to check (spike, envelope, membrane, nucleocapsid, any protein given with --length, or 'all')",
        value_name = "PROTEIN"
    )]
    pub protein: String,

    #[arg(
        short = 't',
        long = "top",
        help = "Output the MHC II allele with the strongest binding affinity for a single epitope",
        action = clap::ArgAction::SetTrue
    )]
    pub top: bool,

    #[arg(
        short = 'w',
        long = "weakest",
        help = "Output the MHC II allele with the weakest binding affinity for a single epitope",
        action = clap::ArgAction::SetTrue
    )]
    pub weakest: bool,

    #[arg(
        short = 's',
        long = "strongly-binding",
        help = "List the MHC II alleles with the highest number of strongly-binding epitopes",
        action = clap::ArgAction::SetTrue
    )]
    pub strongly_binding: bool,

    #[arg(
        short = 'b',
        long = "both-weak-and-strong",
        help = "List the MHC II alleles with the highest number of strongly- and weakly-binding epitopes",
        action = clap::ArgAction::SetTrue
    )]
    pub both_weak_and_strong: bool,

    #[arg(
        short = 'n',
        long = "best",
        help = "Number of alleles to list per protein",
        value_name = "N",
        default_value_t = 5
    )]
    pub best: usize,

    #[arg(
        short = 'd',
        long = "dir",
        help = "Directory holding the NetMHCIIpan .out files",
        value_name = "DIR",
        default_value = "."
    )]
    pub dir: PathBuf,

    #[arg(
        long = "length",
        help = "Define or override a protein length, e.g. orf8=121",
        value_name = "NAME=LENGTH"
    )]
    pub lengths: Vec<Protein>,

    #[arg(
        short = 'L',
        long = "level",
        help = "Logging level",
        value_name = "LEVEL",
        default_value_t = log::Level::Info,
    )]
    pub level: log::Level,

    #[cfg(feature = "serialization")]
    #[arg(
        long = "json",
        help = "Print the parsed dataset as JSON",
        action = clap::ArgAction::SetTrue
    )]
    pub json: bool,
}

impl Args {
    fn lookup(&self, name: &str) -> Option<Protein> {
        self.lengths
            .iter()
            .rev()
            .find(|p| p.name == name)
            .cloned()
            .or_else(|| Protein::lookup(name))
    }

    /// Proteins selected with `--protein`, in report order
    pub fn proteins(&self) -> Result<Vec<Protein>, String> {
        if self.protein != ALL {
            return self
                .lookup(&self.protein)
                .map(|p| vec![p])
                .ok_or_else(|| {
                    format!(
                        "Unknown protein {:?}, give its length with --length {}=<LENGTH>",
                        self.protein, self.protein
                    )
                });
        }

        let mut proteins = Protein::structural()
            .into_iter()
            .filter_map(|p| self.lookup(&p.name))
            .collect::<Vec<_>>();
        for extra in &self.lengths {
            if !proteins.iter().any(|p| p.name == extra.name) {
                proteins.extend(self.lookup(&extra.name));
            }
        }
        Ok(proteins)
    }
}
