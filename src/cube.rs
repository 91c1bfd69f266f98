//! Decoder for the multi-block, semicolon-delimited cube files served by `data/cubefile`.
//!
//! A cube file looks like this (abridged):
//!
//! ```text
//! K;DQ;FACH-SCHL;GHH-ART;GHM-WERTE-JN
//! D;12411BJ001;OHNE;N
//! K;DQA;NAME;RHF-BSR;RHF-ACHSE
//! D;DINSG;1;1
//! K;DQZ;NAME;ZI-RHF-BSR
//! D;STAG;2
//! K;DQI;NAME;ZI-RHF-BSR;DST;NKM-STELLEN
//! D;BEVSTD;3;FEST;0
//! K;QEI;FACH-SCHL;ZI-WERT;WERT;QUALITAET;GESPERRT;WERT-VERFAELSCHT
//! D;DG;31.12.1950;69346297;e;;0
//! ```

use std::collections::BTreeMap;

use crate::error::DecodeError;

const HEADER_MARKER: char = 'K';
const FIELD_SEPARATOR: char = ';';
const VALUE_FLAGS: [&str; 2] = ["\"nur Werte\"", "\"mit Werten\""];
/// Number of value related columns per variable at the end of an observations header.
const VALUE_COLUMNS: usize = 4;

/// The block kinds GENESIS emits in a cube file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKind {
    /// `DQ`
    Description,
    /// `DQ-ERH`
    Collection,
    /// `DQA`
    ClassifyingAxes,
    /// `DQZ`
    TimeAxis,
    /// `DQI`
    ValueVariables,
    /// `QEI`
    Observations,
    Other(String),
}

impl BlockKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "DQ" => Self::Description,
            "DQ-ERH" => Self::Collection,
            "DQA" => Self::ClassifyingAxes,
            "DQZ" => Self::TimeAxis,
            "DQI" => Self::ValueVariables,
            "QEI" => Self::Observations,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Description => "DQ",
            Self::Collection => "DQ-ERH",
            Self::ClassifyingAxes => "DQA",
            Self::TimeAxis => "DQZ",
            Self::ValueVariables => "DQI",
            Self::Observations => "QEI",
            Self::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeBlock {
    pub kind: BlockKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CubeBlock {
    pub fn new(kind: BlockKind, columns: Vec<String>) -> Self {
        Self {
            kind,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom. `None` if the column is unknown or a row is
    /// too short to hold it.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|r| r.get(idx).map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All blocks of one cube file, keyed by their kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cube {
    pub description: Option<CubeBlock>,
    pub collection: Option<CubeBlock>,
    pub classifying_axes: Option<CubeBlock>,
    pub time_axis: Option<CubeBlock>,
    pub value_variables: Option<CubeBlock>,
    pub observations: Option<CubeBlock>,
    pub other: BTreeMap<String, CubeBlock>,
}

impl Cube {
    pub fn get(&self, kind: &BlockKind) -> Option<&CubeBlock> {
        match kind {
            BlockKind::Description => self.description.as_ref(),
            BlockKind::Collection => self.collection.as_ref(),
            BlockKind::ClassifyingAxes => self.classifying_axes.as_ref(),
            BlockKind::TimeAxis => self.time_axis.as_ref(),
            BlockKind::ValueVariables => self.value_variables.as_ref(),
            BlockKind::Observations => self.observations.as_ref(),
            BlockKind::Other(tag) => self.other.get(tag),
        }
    }

    /// Like [`Cube::get`], but a missing block is an error.
    pub fn block(&self, kind: &BlockKind) -> Result<&CubeBlock, crate::error::RenameError> {
        self.get(kind)
            .ok_or_else(|| crate::error::RenameError::MissingBlock(kind.tag().to_string()))
    }

    /// Stores a block under its own kind. A block of the same kind is replaced.
    pub fn insert(&mut self, block: CubeBlock) {
        match &block.kind {
            BlockKind::Description => self.description = Some(block),
            BlockKind::Collection => self.collection = Some(block),
            BlockKind::ClassifyingAxes => self.classifying_axes = Some(block),
            BlockKind::TimeAxis => self.time_axis = Some(block),
            BlockKind::ValueVariables => self.value_variables = Some(block),
            BlockKind::Observations => self.observations = Some(block),
            BlockKind::Other(tag) => {
                self.other.insert(tag.clone(), block);
            }
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &CubeBlock> {
        [
            &self.description,
            &self.collection,
            &self.classifying_axes,
            &self.time_axis,
            &self.value_variables,
            &self.observations,
        ]
        .into_iter()
        .flatten()
        .chain(self.other.values())
    }

    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// Names declared in the `DQI` block, in declaration order.
    pub fn value_variable_names(&self) -> Vec<String> {
        self.value_variables
            .as_ref()
            .and_then(|b| b.column("NAME"))
            .map(|names| names.into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

pub(crate) fn is_header(line: &str) -> bool {
    line.starts_with(HEADER_MARKER)
}

/// Gives every repeated column name a 1-based counter: `FACH-SCHL` twice becomes
/// `FACH-SCHL-1`, `FACH-SCHL-2`. Unique names are kept.
pub fn disambiguate(names: &[String]) -> Vec<String> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *totals.entry(name.as_str()).or_default() += 1;
    }

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    names
        .iter()
        .map(|name| {
            if totals[name.as_str()] == 1 {
                return name.clone();
            }
            let n = seen.entry(name.as_str()).or_default();
            *n += 1;
            format!("{}-{}", name, n)
        })
        .collect()
}

fn parse_header(line: &str, lineno: usize) -> Result<(BlockKind, Vec<String>), DecodeError> {
    let mut fields = line.split(FIELD_SEPARATOR);
    fields.next();
    let tag = fields
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DecodeError::MissingBlockType { line: lineno })?;

    let raw: Vec<String> = fields
        .filter(|name| !VALUE_FLAGS.contains(name))
        .map(str::to_string)
        .collect();

    Ok((BlockKind::from_tag(tag), disambiguate(&raw)))
}

/// Repeats the trailing value columns once per declared variable, prefixed with its name.
fn expand_value_columns(columns: Vec<String>, variables: &[String]) -> Result<Vec<String>, DecodeError> {
    if variables.len() <= 1 {
        return Ok(columns);
    }
    if columns.len() < VALUE_COLUMNS {
        return Err(DecodeError::ValueColumns {
            variables: variables.len(),
            found: columns.len(),
        });
    }

    let split = columns.len() - VALUE_COLUMNS;
    let (axes, values) = columns.split_at(split);
    let mut out = axes.to_vec();
    for var in variables {
        out.extend(values.iter().map(|col| format!("{}_{}", var, col)));
    }
    Ok(out)
}

/// Decodes a complete cube file.
pub fn decode(text: &str) -> Result<Cube, DecodeError> {
    let mut cube = Cube::default();
    let mut current: Option<CubeBlock> = None;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if is_header(line) {
            if let Some(block) = current.take() {
                cube.insert(block);
            }

            let (kind, mut columns) = parse_header(line, lineno)?;
            if kind == BlockKind::Observations {
                columns = expand_value_columns(columns, &cube.value_variable_names())?;
            }
            current = Some(CubeBlock::new(kind, columns));
            continue;
        }

        // banner lines before the first header
        let Some(block) = current.as_mut() else {
            continue;
        };

        let values: Vec<String> = line
            .split(FIELD_SEPARATOR)
            .skip(1)
            .map(str::to_string)
            .collect();
        if values.len() != block.columns.len() {
            return Err(DecodeError::RowWidth {
                block: block.kind.tag().to_string(),
                line: lineno,
                expected: block.columns.len(),
                found: values.len(),
            });
        }
        block.rows.push(values);
    }

    match current {
        Some(block) => {
            cube.insert(block);
            Ok(cube)
        }
        None => Err(DecodeError::NoHeader),
    }
}
