//! Tab-separated report layout
use mhcii_affinity::allele::{reform, ShapeError};
use mhcii_affinity::ranking::{AlleleRank, EpitopeHit};
use mhcii_affinity::Protein;

pub const EPITOPE_HEADER: &str = "Protein\tMHC II Allele\tPeptide\tCore\tPosition\tEL Score";
pub const STRONG_TITLE: &str = "\t\tStrong Binders";
pub const TOTAL_TITLE: &str = "\t\tTotal (Strong + Weak) Binders";
pub const BINDER_HEADER: &str = "Protein (Length)\tMHC II Allele\tTotal\tper 100 Amino Acids";

pub fn epitope_row(protein: &Protein, hit: &EpitopeHit) -> Result<String, ShapeError> {
    Ok(format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        protein.name,
        reform(hit.allele)?,
        hit.prediction.peptide,
        hit.prediction.core,
        hit.prediction.position,
        hit.prediction.el_score
    ))
}

/// One line per ranked allele; the protein is only named on the first line.
/// With `split` the strong/weak breakdown is added to the total.
pub fn binder_block(protein: &Protein, ranks: &[AlleleRank], split: bool) -> Result<String, ShapeError> {
    let mut out = String::new();
    for (i, rank) in ranks.iter().enumerate() {
        let label = if i == 0 {
            format!("{} ({})", protein.name, protein.length)
        } else {
            String::new()
        };
        let total = if split {
            format!("{} ({} strong; {} weak)", rank.count, rank.strong, rank.weak)
        } else {
            rank.count.to_string()
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{:.2}\n",
            label,
            reform(rank.allele)?,
            total,
            rank.per_100
        ));
    }
    Ok(out)
}
