//! Summary queries over a parsed `ProteinTable`
//!
//! All queries iterate the table in allele-name order, and ties are broken in
//! favour of the alphabetically first allele.
use crate::protein::{AlleleBinderSummary, EpitopePrediction, ProteinTable};
use crate::util;

#[cfg(feature = "serialization")]
use serde::Serialize;

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
/// An allele together with its representative epitope
pub struct EpitopeHit<'a> {
    pub allele: &'a str,
    pub prediction: &'a EpitopePrediction,
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
/// An allele ranked by the number of binders it has on a protein
pub struct AlleleRank<'a> {
    pub allele: &'a str,
    pub strong: u32,
    pub weak: u32,
    /// The value the ranking was sorted on
    pub count: u64,
    /// `count` per 100 residues of the protein
    pub per_100: f64,
}

/// Representative epitope of every allele that has at least one prediction.
///
/// The representative is the first prediction in file order, not the best
/// scoring one.
fn representatives(table: &ProteinTable) -> impl Iterator<Item = EpitopeHit<'_>> {
    table.iter().filter_map(|(allele, summary)| {
        summary
            .representative()
            .map(|prediction| EpitopeHit { allele, prediction })
    })
}

/// The allele whose representative epitope has the highest EL score
pub fn strongest_epitope(table: &ProteinTable) -> Option<EpitopeHit<'_>> {
    representatives(table).fold(None, |best, hit| match best {
        Some(b) if b.prediction.el_score >= hit.prediction.el_score => Some(b),
        _ => Some(hit),
    })
}

/// The allele whose representative epitope has the lowest EL score
pub fn weakest_epitope(table: &ProteinTable) -> Option<EpitopeHit<'_>> {
    representatives(table).fold(None, |worst, hit| match worst {
        Some(w) if w.prediction.el_score <= hit.prediction.el_score => Some(w),
        _ => Some(hit),
    })
}

fn top_by<F>(table: &ProteinTable, protein_length: u32, n: usize, count: F) -> Vec<AlleleRank<'_>>
where
    F: Fn(&AlleleBinderSummary) -> u64,
{
    let mut ranks = table
        .iter()
        .map(|(allele, summary)| {
            let c = count(summary);
            AlleleRank {
                allele,
                strong: summary.strong_binders,
                weak: summary.weak_binders,
                count: c,
                per_100: util::per_hundred(c, protein_length),
            }
        })
        .collect::<Vec<_>>();
    // Stable: equal counts keep allele-name order
    ranks.sort_by(|a, b| b.count.cmp(&a.count));
    ranks.truncate(n);
    ranks
}

/// The `n` alleles with the most strong binders
pub fn top_by_strong_binders(table: &ProteinTable, protein_length: u32, n: usize) -> Vec<AlleleRank<'_>> {
    top_by(table, protein_length, n, |s| u64::from(s.strong_binders))
}

/// The `n` alleles with the most strong and weak binders combined
pub fn top_by_total_binders(table: &ProteinTable, protein_length: u32, n: usize) -> Vec<AlleleRank<'_>> {
    top_by(table, protein_length, n, AlleleBinderSummary::total_binders)
}
