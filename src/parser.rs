//! Parse NetMHCIIpan result files
//!
//! The predictor output has no schema: allele blocks are introduced by a
//! `# Allele:` header, binder counts appear on a line containing `binders`,
//! and prediction rows are recognised by containing the current allele key.
//! Each line is first classified into a [`Record`], then a pure [`advance`]
//! step moves the [`State`] forward and yields at most one [`Effect`] on the
//! table being built.

use crate::allele::resolve_locus;
use crate::protein::{AlleleBinderSummary, EpitopePrediction, ProteinTable};

use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Synthetic marker inserted before each file's contents
pub const FAMILY_MARKER: &str = "Family:";
const ALLELE_HEADER: &str = "# Allele:";
const BINDERS: &str = "binders";

// Field offsets on a binder summary line:
// `Number of strong binders: 55 Number of weak binders: 119`
const STRONG_FIELD: usize = 4;
const WEAK_FIELD: usize = 9;

// Field offsets on a prediction row:
// `Pos MHC Peptide Of Core Core_Rel Identity Score_EL ...`
const POSITION_FIELD: usize = 0;
const PEPTIDE_FIELD: usize = 2;
const CORE_FIELD: usize = 4;
const SCORE_FIELD: usize = 7;

#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub enum ErrorKind {
    /// A record line has fewer whitespace-separated fields than required
    Malformed { expected: usize, found: usize },
    /// Error converting a field to a number
    Conversion(String),
    /// No component of a composite allele starts with the current family
    UnresolvedLocus(String),
    /// Binder summary before any `# Allele:` header
    NoAllele,
    /// Line is not valid UTF-8
    Encoding,
}

/// Error that may occur while parsing a result file
#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    file: String,
    line: usize,
    content: String,
}

impl Error {
    /// What went wrong
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Name of the file being parsed
    pub fn file(&self) -> &str {
        &self.file
    }

    /// 1-based line number within the file. Zero refers to the synthetic
    /// family marker.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The offending line
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Malformed { expected, found } => write!(
                f,
                "malformed record, expected at least {} fields but found {}",
                expected, found
            ),
            ErrorKind::Conversion(field) => write!(f, "cannot convert {:?} to a number", field),
            ErrorKind::UnresolvedLocus(allele) => {
                write!(f, "allele {} has no component for the current family", allele)
            }
            ErrorKind::NoAllele => write!(f, "binder summary outside of an allele block"),
            ErrorKind::Encoding => write!(f, "line is not valid UTF-8"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Error parsing {} at line {}: {} ({:?})",
            self.file, self.line, self.kind, self.content
        )
    }
}

impl std::error::Error for Error {}

/// A classified input line
#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub enum Record<'s> {
    /// `Family: DQA1`
    FamilyMarker(&'s str),
    /// `# Allele: HLA-DQA10101-DQB10201`, holding the raw allele token
    AlleleHeader(&'s str),
    BindersSummary { strong: u32, weak: u32 },
    PredictionRow(EpitopePrediction),
    /// Headers, separators, blank lines and anything else
    Other,
}

fn field<'s>(fields: &[&'s str], idx: usize) -> Result<&'s str, ErrorKind> {
    fields.get(idx).copied().ok_or(ErrorKind::Malformed {
        expected: idx + 1,
        found: fields.len(),
    })
}

fn number<T: FromStr>(s: &str) -> Result<T, ErrorKind> {
    s.parse::<T>().map_err(|_| ErrorKind::Conversion(s.into()))
}

/// Classify a single line. `key` is the allele key of the open block, if any;
/// prediction rows are only recognised while a block is open.
pub fn classify<'s>(line: &'s str, key: Option<&str>) -> Result<Record<'s>, ErrorKind> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(FAMILY_MARKER) {
        let family = rest
            .split_whitespace()
            .next()
            .ok_or(ErrorKind::Malformed {
                expected: 2,
                found: 1,
            })?;
        return Ok(Record::FamilyMarker(family));
    }

    if line.starts_with(ALLELE_HEADER) {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        return Ok(Record::AlleleHeader(field(&fields, 2)?));
    }

    if line.contains(BINDERS) {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let strong = number(field(&fields, STRONG_FIELD)?)?;
        let weak = number(field(&fields, WEAK_FIELD)?)?;
        return Ok(Record::BindersSummary { strong, weak });
    }

    match key {
        Some(key) if line.contains(key) => {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            // Check the widest offset first so a short row reports its width
            let el_score = number(field(&fields, SCORE_FIELD)?)?;
            Ok(Record::PredictionRow(EpitopePrediction {
                peptide: field(&fields, PEPTIDE_FIELD)?.into(),
                core: field(&fields, CORE_FIELD)?.into(),
                el_score,
                position: number(field(&fields, POSITION_FIELD)?)?,
            }))
        }
        _ => Ok(Record::Other),
    }
}

/// Parser position within the line stream
#[derive(PartialEq, Debug, Clone)]
pub enum State {
    /// Reading a family's output, no allele block open yet
    Family { family: String },
    /// Inside the block for `key`
    Allele {
        family: String,
        key: String,
        /// Whether a binder summary has been seen for this block
        summarised: bool,
    },
}

impl State {
    pub fn family(&self) -> &str {
        match self {
            State::Family { family } | State::Allele { family, .. } => family.as_str(),
        }
    }

    /// Allele key of the open block
    pub fn key(&self) -> Option<&str> {
        match self {
            State::Family { .. } => None,
            State::Allele { key, .. } => Some(key.as_str()),
        }
    }
}

/// Change to apply to the table being built
#[derive(PartialEq, Debug, Clone)]
pub enum Effect {
    Open(String),
    Binders { key: String, strong: u32, weak: u32 },
    Predict { key: String, prediction: EpitopePrediction },
}

/// Transition function of the parser
pub fn advance(state: &State, record: Record) -> Result<(State, Option<Effect>), ErrorKind> {
    match record {
        Record::FamilyMarker(family) => Ok((
            State::Family {
                family: family.into(),
            },
            None,
        )),
        Record::AlleleHeader(raw) => {
            let family = state.family();
            let key = resolve_locus(raw, family)?.to_string();
            Ok((
                State::Allele {
                    family: family.into(),
                    key: key.clone(),
                    summarised: false,
                },
                Some(Effect::Open(key)),
            ))
        }
        Record::BindersSummary { strong, weak } => match state {
            State::Family { .. } => Err(ErrorKind::NoAllele),
            State::Allele { family, key, .. } => Ok((
                State::Allele {
                    family: family.clone(),
                    key: key.clone(),
                    summarised: true,
                },
                Some(Effect::Binders {
                    key: key.clone(),
                    strong,
                    weak,
                }),
            )),
        },
        Record::PredictionRow(prediction) => match state {
            State::Allele { key, .. } => Ok((
                state.clone(),
                Some(Effect::Predict {
                    key: key.clone(),
                    prediction,
                }),
            )),
            State::Family { .. } => Ok((state.clone(), None)),
        },
        Record::Other => Ok((state.clone(), None)),
    }
}

/// Incremental parser accumulating one protein's `ProteinTable` over any
/// number of result files
pub struct Parser {
    table: ProteinTable,
    state: State,
    /// Keys opened since the last family marker
    opened: HashSet<String>,
    file: String,
    line: usize,
}

impl Parser {
    /// Create a new parser reading alleles of `initial_family` until a
    /// family marker says otherwise
    pub fn new(initial_family: &str) -> Parser {
        Parser {
            table: ProteinTable::default(),
            state: State::Family {
                family: initial_family.into(),
            },
            opened: HashSet::new(),
            file: String::new(),
            line: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Convenience function for creating Error struct
    fn err(&self, kind: ErrorKind, content: &str) -> Error {
        Error {
            kind,
            file: self.file.clone(),
            line: self.line,
            content: content.into(),
        }
    }

    /// Start reading a new file, feeding a synthetic family marker
    pub fn begin_file(&mut self, file: &str, family: &str) -> Result<(), Error> {
        self.file = file.into();
        self.line = 0;
        self.process(&format!("{} {}", FAMILY_MARKER, family))
    }

    /// Feed the next line of the current file
    pub fn feed(&mut self, line: &str) -> Result<(), Error> {
        self.line += 1;
        self.process(line)
    }

    /// Count the next line of the current file as undecodable, returning
    /// the error to report for it
    pub fn undecodable(&mut self) -> Error {
        self.line += 1;
        self.err(ErrorKind::Encoding, "")
    }

    fn process(&mut self, line: &str) -> Result<(), Error> {
        let record = classify(line, self.state.key()).map_err(|kind| self.err(kind, line))?;

        let marker = matches!(record, Record::FamilyMarker(_));
        if marker || matches!(record, Record::AlleleHeader(_)) {
            self.close_block();
        }

        let (state, effect) = advance(&self.state, record).map_err(|kind| self.err(kind, line))?;
        if marker {
            self.opened.clear();
        }
        self.state = state;
        if let Some(effect) = effect {
            self.apply(effect);
        }
        Ok(())
    }

    fn close_block(&self) {
        if let State::Allele {
            key,
            summarised: false,
            ..
        } = &self.state
        {
            warn!("{}: allele {} has no binder summary", self.file, key);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Open(key) => {
                let first_in_file = self.opened.insert(key.clone());
                if first_in_file && self.table.alleles.contains_key(&key) {
                    debug!("{}: appending to allele {} from an earlier file", self.file, key);
                } else {
                    debug!("{}: reading allele {}", self.file, key);
                    self.table.alleles.insert(key, AlleleBinderSummary::default());
                }
            }
            Effect::Binders { key, strong, weak } => {
                let summary = self.table.alleles.entry(key).or_default();
                summary.strong_binders = strong;
                summary.weak_binders = weak;
            }
            Effect::Predict { key, prediction } => {
                self.table
                    .alleles
                    .entry(key)
                    .or_default()
                    .predictions
                    .push(prediction);
            }
        }
    }

    /// Consume the parser, returning the table built so far
    pub fn finish(self) -> ProteinTable {
        self.close_block();
        self.table
    }
}

/// Parse the lines of a single result stream for `initial_family`
pub fn parse<'a, I>(lines: I, initial_family: &str) -> Result<ProteinTable, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = Parser::new(initial_family);
    for line in lines {
        parser.feed(line)?;
    }
    Ok(parser.finish())
}

#[cfg(test)]
mod test {
    use super::*;

    const DRB1: &str = "
# NetMHCIIpan version 4.0

# Threshold for Strong binding peptides (%Rank)	1%
# Threshold for Weak binding peptides (%Rank)	5%

# Allele: DRB1_0101
--------------------------------------------------------------------------------------------------------------------------
 Pos           MHC              Peptide   Of        Core  Core_Rel        Identity      Score_EL %Rank_EL  BindLevel
--------------------------------------------------------------------------------------------------------------------------
   1     DRB1_0101      MFVFLVLLPLVSSQC    2   FLVLLPLVS    0.280         Sequence      0.012210    16.42
   2     DRB1_0101      FVFLVLLPLVSSQCV    3   LVLLPLVSS    0.340         Sequence      0.431000     2.10   <=WB
   3     DRB1_0101      VFLVLLPLVSSQCVN    2   LVLLPLVSS    0.500         Sequence      0.921000     0.40   <=SB
--------------------------------------------------------------------------------------------------------------------------
Number of strong binders: 1 Number of weak binders: 1
--------------------------------------------------------------------------------------------------------------------------

# Allele: DRB1_1501
--------------------------------------------------------------------------------------------------------------------------
   1     DRB1_1501      MFVFLVLLPLVSSQC    4   VLLPLVSSQ    0.120         Sequence      0.101000     8.00
--------------------------------------------------------------------------------------------------------------------------
Number of strong binders: 0 Number of weak binders: 3
";

    const DQA1: &str = "
# Allele: HLA-DQA10101-DQB10201
   7 HLA-DQA10101-DQB10201 LLPLVSSQCVNLTTR 1 LPLVSSQCV 0.600 Sequence 0.250000 9.10
Number of strong binders: 2 Number of weak binders: 4
";

    #[test]
    fn classify_records() {
        assert_eq!(classify("Family: DQB1", None), Ok(Record::FamilyMarker("DQB1")));
        assert_eq!(
            classify("# Allele: DRB1_0101", None),
            Ok(Record::AlleleHeader("DRB1_0101"))
        );
        assert_eq!(
            classify("Number of strong binders: 55 Number of weak binders: 119", None),
            Ok(Record::BindersSummary {
                strong: 55,
                weak: 119
            })
        );
        assert_eq!(
            classify("  12  DRB1_0101  PEPTIDEPEPTIDEP  3  TIDEPEPTI  0.5  Seq  0.75", Some("DRB1_0101")),
            Ok(Record::PredictionRow(EpitopePrediction {
                peptide: "PEPTIDEPEPTIDEP".into(),
                core: "TIDEPEPTI".into(),
                el_score: 0.75,
                position: 12,
            }))
        );
        // Rows are not recognised without an open block
        assert_eq!(
            classify("  12  DRB1_0101  PEPTIDEPEPTIDEP  3  TIDEPEPTI  0.5  Seq  0.75", None),
            Ok(Record::Other)
        );
        assert_eq!(classify("", Some("DRB1_0101")), Ok(Record::Other));
        assert_eq!(
            classify("# Threshold for Strong binding peptides (%Rank)\t1%", Some("DRB1_0101")),
            Ok(Record::Other)
        );
    }

    #[test]
    fn classify_malformed() {
        assert_eq!(
            classify("Number of strong binders: 55", None),
            Err(ErrorKind::Malformed {
                expected: 10,
                found: 5
            })
        );
        assert_eq!(
            classify("Number of strong binders: many Number of weak binders: 3", None),
            Err(ErrorKind::Conversion("many".into()))
        );
        assert_eq!(
            classify("1 DRB1_0101 PEPTIDE", Some("DRB1_0101")),
            Err(ErrorKind::Malformed {
                expected: 8,
                found: 3
            })
        );
        assert_eq!(
            classify("# Allele:", None),
            Err(ErrorKind::Malformed {
                expected: 3,
                found: 2
            })
        );
        assert!(classify("Family:", None).is_err());
    }

    #[test]
    fn advance_transitions() {
        let start = State::Family {
            family: "DQB1".into(),
        };
        let (state, effect) =
            advance(&start, Record::AlleleHeader("HLA-DQA10101-DQB10602")).unwrap();
        assert_eq!(state.key(), Some("DQB10602"));
        assert_eq!(effect, Some(Effect::Open("DQB10602".into())));

        let (state, effect) = advance(&state, Record::BindersSummary { strong: 3, weak: 5 }).unwrap();
        assert_eq!(
            state,
            State::Allele {
                family: "DQB1".into(),
                key: "DQB10602".into(),
                summarised: true
            }
        );
        assert_eq!(
            effect,
            Some(Effect::Binders {
                key: "DQB10602".into(),
                strong: 3,
                weak: 5
            })
        );

        let (state, effect) = advance(&state, Record::FamilyMarker("DRB1")).unwrap();
        assert_eq!(
            state,
            State::Family {
                family: "DRB1".into()
            }
        );
        assert_eq!(effect, None);

        assert_eq!(
            advance(&state, Record::BindersSummary { strong: 1, weak: 1 }),
            Err(ErrorKind::NoAllele)
        );
        assert_eq!(
            advance(&state, Record::AlleleHeader("HLA-DQA10101-DQB10602")),
            Err(ErrorKind::UnresolvedLocus("HLA-DQA10101-DQB10602".into()))
        );
    }

    #[test]
    fn parse_blocks() {
        let table = parse(DRB1.lines(), "DRB1").unwrap();
        assert_eq!(table.len(), 2);

        let a = table.get("DRB1_0101").unwrap();
        assert_eq!((a.strong_binders, a.weak_binders), (1, 1));
        assert_eq!(a.predictions.len(), 3);
        assert_eq!(
            a.predictions.iter().map(|p| p.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(a.predictions[0].peptide, "MFVFLVLLPLVSSQC");
        assert_eq!(a.predictions[0].core, "FLVLLPLVS");
        assert_eq!(a.predictions[2].el_score, 0.921);

        let b = table.get("DRB1_1501").unwrap();
        assert_eq!((b.strong_binders, b.weak_binders), (0, 3));
        assert_eq!(b.predictions.len(), 1);
    }

    #[test]
    fn parse_composite_allele() {
        let table = parse(DQA1.lines(), "DQA1").unwrap();
        assert_eq!(table.len(), 1);
        let s = table.get("DQA10101").unwrap();
        assert_eq!((s.strong_binders, s.weak_binders), (2, 4));
        assert_eq!(s.predictions.len(), 1);
        assert_eq!(s.predictions[0].position, 7);

        let err = parse(DQA1.lines(), "DRB1").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::UnresolvedLocus("HLA-DQA10101-DQB10201".into())
        );
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn rows_before_header_are_ignored() {
        let input = "   1  DRB1_0101  PEPTIDEPEPTIDEP  3  TIDEPEPTI  0.5  Seq  0.75
# Allele: DRB1_0101
Number of strong binders: 0 Number of weak binders: 0";
        let table = parse(input.lines(), "DRB1").unwrap();
        assert!(table.get("DRB1_0101").unwrap().predictions.is_empty());
    }

    #[test]
    fn binders_without_allele() {
        let err = parse(
            "Number of strong binders: 1 Number of weak binders: 2".lines(),
            "DRB1",
        )
        .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoAllele);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn header_in_same_file_overwrites() {
        let input = format!("{}\n# Allele: DRB1_0101\n", DRB1);
        let table = parse(input.lines(), "DRB1").unwrap();
        let a = table.get("DRB1_0101").unwrap();
        assert_eq!(a, &AlleleBinderSummary::default());
    }

    #[test]
    fn block_without_summary_keeps_zero_counts() {
        let input = "\
# Allele: DRB1_0101
   1 DRB1_0101 MFVFLVLLPLVSSQC 2 FLVLLPLVS 0.280 Sequence 0.42 5.00
# Allele: DRB1_1501
   3 DRB1_1501 FLVLLPLVSSQCVNL 2 LVSSQCVNL 0.560 Sequence 0.88 1.20
Number of strong binders: 4 Number of weak binders: 6";
        let table = parse(input.lines(), "DRB1").unwrap();

        let a = table.get("DRB1_0101").unwrap();
        assert_eq!((a.strong_binders, a.weak_binders), (0, 0));
        assert_eq!(a.predictions.len(), 1);
        assert_eq!(a.predictions[0].el_score, 0.42);

        let b = table.get("DRB1_1501").unwrap();
        assert_eq!((b.strong_binders, b.weak_binders), (4, 6));
        assert_eq!(b.predictions.len(), 1);
    }

    #[test]
    fn header_in_later_file_appends() {
        let mut parser = Parser::new("");
        parser.begin_file("DRB1_1_spike.out", "DRB1").unwrap();
        for line in DRB1.lines() {
            parser.feed(line).unwrap();
        }
        parser.begin_file("DRB1_2_spike.out", "DRB1").unwrap();
        for line in DRB1.lines() {
            parser.feed(line).unwrap();
        }
        let table = parser.finish();
        assert_eq!(table.get("DRB1_0101").unwrap().predictions.len(), 6);
        assert_eq!(table.get("DRB1_1501").unwrap().predictions.len(), 2);
        assert_eq!(table.get("DRB1_1501").unwrap().weak_binders, 3);
    }

    #[test]
    fn errors_name_the_file() {
        let mut parser = Parser::new("DRB1");
        parser.begin_file("DRB1_3_envelope.out", "DRB1").unwrap();
        parser.feed("# Allele: DRB1_0101").unwrap();
        let err = parser.feed("Number of strong binders: x").unwrap_err();
        assert_eq!(err.file(), "DRB1_3_envelope.out");
        assert_eq!(err.line(), 2);
        assert_eq!(err.content(), "Number of strong binders: x");
        assert!(err.to_string().contains("DRB1_3_envelope.out"));
    }

    #[test]
    fn reparse_is_identical() {
        let a = parse(DRB1.lines(), "DRB1").unwrap();
        let b = parse(DRB1.lines(), "DRB1").unwrap();
        assert_eq!(a, b);
    }
}
