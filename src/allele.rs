//! Conversion between the allele tokens emitted by NetMHCIIpan and the
//! `LOCUS*MM:mm` names used in reports.
//!
//! NetMHCIIpan accepts DR alleles in a compact `<locus>_<major><minor>` form
//! (e.g. `DRB1_1501`), while DP and DQ molecules are heterodimers and are
//! given as `HLA-<alpha>-<beta>` (e.g. `HLA-DQA10101-DQB10201`). When a single
//! locus is being analysed its partner chain is held fixed, so only the
//! component belonging to that locus is meaningful for aggregation.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::ErrorKind;

/// `DRB1_1501`
static COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{3}[0-9])_([0-9]{2})([0-9]{2,})$").unwrap());

/// `DQA10304`
static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{3}[0-9])([0-9]{2})([0-9]{2,})$").unwrap());

/// `DQA1*03:04`
static REPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{3}[0-9])\*([0-9]{2}):([0-9]{2,})$").unwrap());

/// Fixed partner chains paired with a DP/DQ locus when the predictor is run
/// one locus at a time.
const PARTNERS: [(&str, &str); 4] = [
    ("DPA", "DPB10101"),
    ("DPB", "DPA10103"),
    ("DQA", "DQB10201"),
    ("DQB", "DQA10101"),
];

/// An allele token that matches none of the accepted layouts
#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub struct ShapeError {
    token: String,
}

impl ShapeError {
    fn new(token: &str) -> ShapeError {
        ShapeError {
            token: token.into(),
        }
    }

    /// The rejected token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unrecognized allele token shape: {:?}", self.token)
    }
}

impl std::error::Error for ShapeError {}

/// Convert a predictor allele token into report form.
///
/// ```
/// use mhcii_affinity::allele::reform;
/// assert_eq!(reform("DRB1_1501").unwrap(), "DRB1*15:01");
/// assert_eq!(reform("DQA10304").unwrap(), "DQA1*03:04");
/// ```
pub fn reform(token: &str) -> Result<String, ShapeError> {
    let caps = COMPACT
        .captures(token)
        .or_else(|| CANONICAL.captures(token))
        .ok_or_else(|| ShapeError::new(token))?;
    Ok(format!("{}*{}:{}", &caps[1], &caps[2], &caps[3]))
}

/// Reduce a raw `# Allele:` token to the key for the locus under analysis.
///
/// Tokens that already start with `family` are returned unchanged; composite
/// heterodimer names are split on `-` and the component for `family` is
/// returned.
pub fn resolve_locus<'a>(raw: &'a str, family: &str) -> Result<&'a str, ErrorKind> {
    if raw.starts_with(family) {
        return Ok(raw);
    }
    raw.split('-')
        .find(|component| component.starts_with(family))
        .ok_or_else(|| ErrorKind::UnresolvedLocus(raw.into()))
}

/// Build the token NetMHCIIpan expects for a report-form allele name.
///
/// DR alleles use the compact `<locus>_<major><minor>` form; DP and DQ
/// alleles are paired with the fixed partner chain for their locus.
pub fn predictor_token(name: &str) -> Result<String, ShapeError> {
    let caps = REPORT.captures(name).ok_or_else(|| ShapeError::new(name))?;
    let locus = &caps[1];
    let digits = format!("{}{}", &caps[2], &caps[3]);

    if locus.starts_with("DR") {
        return Ok(format!("{}_{}", locus, digits));
    }

    let (_, partner) = PARTNERS
        .iter()
        .find(|(prefix, _)| locus.starts_with(prefix))
        .ok_or_else(|| ShapeError::new(name))?;
    let own = format!("{}{}", locus, digits);
    // Alpha chain is always listed first
    if locus.as_bytes()[2] == b'A' {
        Ok(format!("HLA-{}-{}", own, partner))
    } else {
        Ok(format!("HLA-{}-{}", partner, own))
    }
}
