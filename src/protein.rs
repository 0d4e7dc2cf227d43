//! Proteins of interest and the per-allele prediction records parsed for them
#[cfg(feature = "serialization")]
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// SARS-CoV-2 structural proteins and their lengths in residues
const STRUCTURAL: [(&str, u32); 4] = [
    ("spike", 1273),
    ("envelope", 75),
    ("membrane", 222),
    ("nucleocapsid", 419),
];

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
/// A protein whose result files are aggregated into one `ProteinTable`
pub struct Protein {
    /// Name as it appears in result file names, e.g. `spike`
    pub name: String,
    /// Sequence length, used to express binder counts per 100 residues
    pub length: u32,
}

impl Protein {
    pub fn new(name: &str, length: u32) -> Protein {
        Protein {
            name: name.into(),
            length,
        }
    }

    /// Look up one of the built-in structural proteins
    pub fn lookup(name: &str) -> Option<Protein> {
        STRUCTURAL
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, len)| Protein::new(n, *len))
    }

    /// All built-in proteins, in report order
    pub fn structural() -> Vec<Protein> {
        STRUCTURAL
            .iter()
            .map(|(n, len)| Protein::new(n, *len))
            .collect()
    }
}

/// Error returned when a `name=length` protein definition cannot be read
#[derive(PartialEq, Debug)]
pub struct ProteinDefError(String);

impl fmt::Display for ProteinDefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid protein definition {:?}, expected <name>=<length>",
            self.0
        )
    }
}

impl std::error::Error for ProteinDefError {}

impl FromStr for Protein {
    type Err = ProteinDefError;

    /// Parse `name=length`, e.g. `spike=1273`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ProteinDefError(s.into());
        let (name, length) = s.split_once('=').ok_or_else(err)?;
        let name = name.trim();
        let length = length.trim().parse::<u32>().map_err(|_| err())?;
        if name.is_empty() || length == 0 {
            return Err(err());
        }
        Ok(Protein::new(name, length))
    }
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, PartialOrd, Clone, Debug)]
/// A single candidate binding event reported for an allele
pub struct EpitopePrediction {
    /// Peptide sequence
    pub peptide: String,
    /// Binding core within the peptide
    pub core: String,
    /// Eluted-ligand likelihood score
    pub el_score: f64,
    /// 1-based start offset within the source protein
    pub position: u32,
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, PartialOrd, Clone, Debug, Default)]
/// Binder counts and predictions for one allele of one protein
pub struct AlleleBinderSummary {
    pub strong_binders: u32,
    pub weak_binders: u32,
    /// Predictions in order of appearance in the result file. This is not
    /// necessarily sorted by score.
    pub predictions: Vec<EpitopePrediction>,
}

impl AlleleBinderSummary {
    /// Total of strong and weak binders
    pub fn total_binders(&self) -> u64 {
        u64::from(self.strong_binders) + u64::from(self.weak_binders)
    }

    /// The first-seen prediction, used as the allele's representative epitope
    pub fn representative(&self) -> Option<&EpitopePrediction> {
        self.predictions.first()
    }
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, Clone, Debug, Default)]
/// Per-allele summaries for a single protein, keyed by the allele token as
/// emitted by the predictor (after locus resolution)
pub struct ProteinTable {
    pub alleles: BTreeMap<String, AlleleBinderSummary>,
}

impl ProteinTable {
    pub fn get(&self, allele: &str) -> Option<&AlleleBinderSummary> {
        self.alleles.get(allele)
    }

    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    /// Iterate over alleles in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AlleleBinderSummary)> {
        self.alleles.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of predictions across all alleles
    pub fn prediction_count(&self) -> usize {
        self.alleles.values().map(|s| s.predictions.len()).sum()
    }
}
