//! Replaces the generic axis columns of the observations block with variable names.

use std::cmp::Ordering;

use crate::cube::{BlockKind, Cube, CubeBlock};
use crate::error::RenameError;

const CLASSIFYING_PREFIX: &str = "FACH-SCHL";
const TIME_COLUMN: &str = "ZI-WERT";
const VALUE_PREFIX: &str = "WERT";

const NAME: &str = "NAME";
const AXIS_POSITION: &str = "RHF-ACHSE";

/// Which renaming passes to run. All three are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameOptions {
    pub classifying_variables: bool,
    pub time_variable: bool,
    pub value_variables: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            classifying_variables: true,
            time_variable: true,
            value_variables: true,
        }
    }
}

impl RenameOptions {
    pub fn none() -> Self {
        Self {
            classifying_variables: false,
            time_variable: false,
            value_variables: false,
        }
    }
}

fn names_of(block: &CubeBlock) -> Result<Vec<String>, RenameError> {
    block
        .column(NAME)
        .map(|v| v.into_iter().map(str::to_string).collect())
        .ok_or_else(|| missing_column(block, NAME))
}

fn missing_column(block: &CubeBlock, column: &str) -> RenameError {
    RenameError::MissingColumn {
        block: block.kind.tag().to_string(),
        column: column.to_string(),
    }
}

/// `DQA` names ordered by their declared axis position.
fn classifying_names(block: &CubeBlock) -> Result<Vec<String>, RenameError> {
    let names = names_of(block)?;
    let positions = block
        .column(AXIS_POSITION)
        .ok_or_else(|| missing_column(block, AXIS_POSITION))?;

    let mut pairs: Vec<(&str, String)> = positions.into_iter().zip(names).collect();
    // stable, so equal positions keep their file order
    pairs.sort_by(|(a, _), (b, _)| compare_positions(a, b));
    Ok(pairs.into_iter().map(|(_, name)| name).collect())
}

fn compare_positions(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Returns a copy of `cube` whose observation columns carry the variable names declared in the
/// metadata blocks. Other blocks are copied unchanged.
pub fn rename_axes(cube: &Cube, options: &RenameOptions) -> Result<Cube, RenameError> {
    let mut renamed = cube.clone();
    if *options == RenameOptions::none() {
        return Ok(renamed);
    }

    let observations = cube.block(&BlockKind::Observations)?;
    let mut pairs: Vec<(usize, String)> = Vec::new();

    if options.classifying_variables {
        let new = classifying_names(cube.block(&BlockKind::ClassifyingAxes)?)?;
        let old = observations
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(CLASSIFYING_PREFIX))
            .map(|(i, _)| i);
        pairs.extend(old.zip(new));
    }

    if options.time_variable {
        let new = names_of(cube.block(&BlockKind::TimeAxis)?)?;
        if let Some(idx) = observations.column_index(TIME_COLUMN) {
            pairs.extend(std::iter::once(idx).zip(new));
        }
    }

    if options.value_variables {
        let new = names_of(cube.block(&BlockKind::ValueVariables)?)?;
        let old = observations
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(VALUE_PREFIX))
            .map(|(i, _)| i);
        pairs.extend(old.zip(new));
    }

    if let Some(block) = renamed.observations.as_mut() {
        for (idx, name) in pairs {
            block.columns[idx] = name;
        }
    }
    Ok(renamed)
}
