//! Collection of per-protein tables representing a single run
//!
//! All result files for a protein are fed through one `Parser`, each preceded
//! by a synthetic family marker derived from the file name. A parse failure
//! drops the remainder of that file only; rows already read are kept.
use crate::parser::{self, Parser};
use crate::protein::{Protein, ProteinTable};
use crate::util;

use log::{debug, info, warn};
#[cfg(feature = "serialization")]
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

const RESULT_EXTENSION: &str = ".out";

/// Error reading result files from disk
#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "Error reading {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> LoadError {
    let path = path.to_path_buf();
    move |source| LoadError::Io { path, source }
}

/// A predictor output file tagged with the locus family it was run for
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct ResultFile {
    pub path: PathBuf,
    pub name: String,
    pub family: String,
}

impl ResultFile {
    /// Tag a file using the family prefix of its name, e.g.
    /// `DQB1_1_spike.out` is read as `DQB1` output
    pub fn from_path<P: AsRef<Path>>(path: P) -> ResultFile {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !name.contains('_') {
            debug!("{} has no family prefix, reading it as {} output", name, name);
        }
        ResultFile {
            family: util::family_of(&name).into(),
            path: path.into(),
            name,
        }
    }
}

/// Find the result files for `protein` in `dir`: every `*.out` file whose
/// name contains the protein name, sorted by path
pub fn discover<P: AsRef<Path>>(dir: P, protein: &str) -> Result<Vec<ResultFile>, LoadError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if !path.is_file() {
            continue;
        }
        let file = ResultFile::from_path(&path);
        if file.name.contains(protein) && file.name.ends_with(RESULT_EXTENSION) {
            files.push(file);
        }
    }
    files.sort();
    debug!("Found {} result files for {} in {}", files.len(), protein, dir.display());
    Ok(files)
}

/// Accumulates one protein's table across files
struct Aggregation {
    parser: Parser,
    failures: Vec<parser::Error>,
}

impl Aggregation {
    fn new() -> Aggregation {
        Aggregation {
            parser: Parser::new(""),
            failures: Vec::new(),
        }
    }

    fn skip(&mut self, err: parser::Error) {
        warn!("Skipping rest of {}: {}", err.file(), err);
        self.failures.push(err);
    }

    fn add<R: BufRead>(&mut self, name: &str, family: &str, reader: R) -> io::Result<()> {
        debug!("Reading {} as {} output", name, family);
        if let Err(err) = self.parser.begin_file(name, family) {
            self.skip(err);
            return Ok(());
        }
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    let err = self.parser.undecodable();
                    self.skip(err);
                    break;
                }
                Err(err) => return Err(err),
            };
            if let Err(err) = self.parser.feed(&line) {
                self.skip(err);
                break;
            }
        }
        Ok(())
    }

    fn finish(self) -> (ProteinTable, Vec<parser::Error>) {
        (self.parser.finish(), self.failures)
    }
}

/// Build a table from in-memory `(file name, contents)` pairs
pub fn build<'a, I>(sources: I) -> (ProteinTable, Vec<parser::Error>)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut agg = Aggregation::new();
    for (name, contents) in sources {
        // Reading from a byte slice cannot fail
        let _ = agg.add(name, util::family_of(name), contents.as_bytes());
    }
    agg.finish()
}

/// Build a table from result files on disk, opening one file at a time
pub fn build_from_files(
    files: &[ResultFile],
) -> Result<(ProteinTable, Vec<parser::Error>), LoadError> {
    let mut agg = Aggregation::new();
    for file in files {
        let reader = BufReader::new(File::open(&file.path).map_err(io_err(&file.path))?);
        agg.add(&file.name, &file.family, reader)
            .map_err(io_err(&file.path))?;
    }
    Ok(agg.finish())
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, Clone, Debug)]
/// A protein and the table parsed for it
pub struct ProteinEntry {
    pub protein: Protein,
    pub table: ProteinTable,
}

#[cfg_attr(feature = "serialization", derive(Serialize))]
#[derive(PartialEq, Clone, Debug, Default)]
/// Container for the predictions read in a single run
pub struct Dataset {
    /// Tables keyed by protein name
    pub proteins: BTreeMap<String, ProteinEntry>,
    /// Files that could only be partially read
    #[cfg_attr(feature = "serialization", serde(skip))]
    pub failures: Vec<parser::Error>,
}

impl Dataset {
    pub fn new() -> Dataset {
        Dataset::default()
    }

    /// Discover and parse all result files for `protein` in `dir`
    pub fn load<P: AsRef<Path>>(&mut self, dir: P, protein: Protein) -> Result<&ProteinEntry, LoadError> {
        let files = discover(dir, &protein.name)?;
        if files.is_empty() {
            warn!("No result files found for {}", protein.name);
        }
        let (table, failures) = build_from_files(&files)?;
        info!(
            "Parsed {} alleles ({} predictions) for {} from {} files",
            table.len(),
            table.prediction_count(),
            protein.name,
            files.len()
        );
        self.failures.extend(failures);
        Ok(self.insert(protein, table))
    }

    /// Add a table, replacing any previous table for the same protein
    pub fn insert(&mut self, protein: Protein, table: ProteinTable) -> &ProteinEntry {
        let name = protein.name.clone();
        self.proteins.insert(name.clone(), ProteinEntry { protein, table });
        &self.proteins[&name]
    }

    pub fn get(&self, protein: &str) -> Option<&ProteinEntry> {
        self.proteins.get(protein)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProteinEntry> {
        self.proteins.values()
    }
}
