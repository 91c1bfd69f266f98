//! The analysis-ready table and the casting of value columns to their declared types.

use crate::axes::{RenameOptions, rename_axes};
use crate::cube::{BlockKind, Cube, CubeBlock, decode};
use crate::error::{CastError, DecodeError, GenesisError, RenameError};

const TYPE_COLUMN: &str = "DST";
const INTEGER_MARKER: &str = "GANZ";
const FIXED_POINT_MARKER: &str = "FEST";
const VALUE_COLUMN: &str = "WERT";
const FFCSV_DELIMITER: u8 = b';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Text,
    Integer,
    Float,
}

impl DataType {
    /// Maps a `DST` marker of the `DQI` block. Unknown markers stay text.
    pub fn from_marker(marker: &str) -> Self {
        match marker.trim() {
            INTEGER_MARKER => Self::Integer,
            FIXED_POINT_MARKER => Self::Float,
            _ => Self::Text,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::Text,
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    /// Returns a copy with `name` converted to `to`.
    pub fn cast_column(&self, name: &str, to: DataType) -> Result<Table, CastError> {
        let mut out = self.clone();
        let column = out
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| CastError::MissingColumn(name.to_string()))?;
        column.data = cast(name, &column.data, to)?;
        Ok(out)
    }
}

impl TryFrom<&CubeBlock> for Table {
    type Error = DecodeError;

    fn try_from(block: &CubeBlock) -> Result<Self, DecodeError> {
        let width = block.columns.len();
        if let Some((idx, row)) = block.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(DecodeError::RowWidth {
                block: block.kind.tag().to_string(),
                line: idx + 1,
                expected: width,
                found: row.len(),
            });
        }

        let columns = block
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| Column {
                name: name.clone(),
                data: ColumnData::Text(block.rows.iter().map(|r| r[idx].clone()).collect()),
            })
            .collect();
        Ok(Self { columns })
    }
}

/// Parses the `ffcsv` answer of `data/tablefile`.
///
/// Columns holding only whole numbers become integers and columns holding only numbers become
/// floats. Anything else stays text, and so do key columns with leading zeros.
pub fn parse_ffcsv(text: &str) -> Result<Table, GenesisError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(FFCSV_DELIMITER)
        .from_reader(text.as_bytes());

    let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut values: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in values.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, v)| Column {
            name,
            data: infer(v),
        })
        .collect();
    Ok(Table { columns })
}

fn infer(values: Vec<String>) -> ColumnData {
    if values.is_empty() || values.iter().any(|s| has_leading_zero(s.trim())) {
        return ColumnData::Text(values);
    }
    let ints: Option<Vec<i64>> = values.iter().map(|s| s.trim().parse().ok()).collect();
    if let Some(ints) = ints {
        return ColumnData::Integer(ints);
    }
    let floats: Option<Vec<f64>> = values.iter().map(|s| parse_float(s)).collect();
    match floats {
        Some(floats) => ColumnData::Float(floats),
        None => ColumnData::Text(values),
    }
}

fn has_leading_zero(s: &str) -> bool {
    s.len() > 1 && s.starts_with('0') && !s[1..].starts_with(['.', ','])
}

fn cast(name: &str, data: &ColumnData, to: DataType) -> Result<ColumnData, CastError> {
    let invalid = |row: usize, value: String| CastError::InvalidValue {
        column: name.to_string(),
        row,
        value,
        expected: to.label(),
    };

    match (data, to) {
        (ColumnData::Text(v), DataType::Text) => Ok(ColumnData::Text(v.clone())),
        (ColumnData::Integer(v), DataType::Integer) => Ok(ColumnData::Integer(v.clone())),
        (ColumnData::Float(v), DataType::Float) => Ok(ColumnData::Float(v.clone())),

        (ColumnData::Text(v), DataType::Integer) => v
            .iter()
            .enumerate()
            .map(|(row, s)| s.trim().parse::<i64>().map_err(|_| invalid(row, s.clone())))
            .collect::<Result<_, _>>()
            .map(ColumnData::Integer),
        (ColumnData::Text(v), DataType::Float) => v
            .iter()
            .enumerate()
            .map(|(row, s)| parse_float(s).ok_or_else(|| invalid(row, s.clone())))
            .collect::<Result<_, _>>()
            .map(ColumnData::Float),

        (ColumnData::Integer(v), DataType::Float) => {
            Ok(ColumnData::Float(v.iter().map(|&x| x as f64).collect()))
        }
        (ColumnData::Float(v), DataType::Integer) => v
            .iter()
            .enumerate()
            .map(|(row, &x)| {
                if x.fract() == 0.0 && x.is_finite() {
                    Ok(x as i64)
                } else {
                    Err(invalid(row, x.to_string()))
                }
            })
            .collect::<Result<_, _>>()
            .map(ColumnData::Integer),

        (ColumnData::Integer(v), DataType::Text) => {
            Ok(ColumnData::Text(v.iter().map(i64::to_string).collect()))
        }
        (ColumnData::Float(v), DataType::Text) => {
            Ok(ColumnData::Text(v.iter().map(f64::to_string).collect()))
        }
    }
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .or_else(|| {
            // decimal comma
            if s.contains('.') {
                None
            } else {
                s.replace(',', ".").parse().ok()
            }
        })
        .filter(|x: &f64| x.is_finite())
}

/// `(variable, type)` pairs declared in the `DQI` block.
pub fn declared_types(cube: &Cube) -> Result<Vec<(String, DataType)>, RenameError> {
    let block = cube.block(&BlockKind::ValueVariables)?;
    let missing = |column: &str| RenameError::MissingColumn {
        block: block.kind.tag().to_string(),
        column: column.to_string(),
    };
    let names = block.column("NAME").ok_or_else(|| missing("NAME"))?;
    let types = block.column(TYPE_COLUMN).ok_or_else(|| missing(TYPE_COLUMN))?;

    Ok(names
        .into_iter()
        .zip(types)
        .map(|(n, t)| (n.to_string(), DataType::from_marker(t)))
        .collect())
}

/// Finds the value column of `variable`: `<VAR>_WERT` when several variables were expanded,
/// `<VAR>` after value renaming, bare `WERT` for a single unrenamed variable.
fn value_column<'a>(table: &'a Table, variable: &str, single: bool) -> Option<&'a str> {
    let prefixed = format!("{}_{}", variable, VALUE_COLUMN);
    [prefixed.as_str(), variable]
        .into_iter()
        .chain(single.then_some(VALUE_COLUMN))
        .find_map(|candidate| table.column(candidate).map(|c| c.name.as_str()))
}

/// Builds the final table from the observations block, with every declared value column cast
/// to its `DST` type.
pub fn cast_types(cube: &Cube) -> Result<Table, GenesisError> {
    let declared = declared_types(cube)?;
    let mut table = Table::try_from(cube.block(&BlockKind::Observations)?)?;
    let single = declared.len() == 1;

    for (variable, data_type) in &declared {
        let column = value_column(&table, variable, single)
            .ok_or_else(|| CastError::MissingColumn(variable.clone()))?
            .to_string();
        if *data_type != DataType::Text {
            table = table.cast_column(&column, *data_type)?;
        }
    }
    Ok(table)
}

/// Decodes a cube file, renames its axes and casts the value columns.
pub fn decode_table(text: &str, options: &RenameOptions) -> Result<Table, GenesisError> {
    let cube = decode(text)?;
    let renamed = rename_axes(&cube, options)?;
    cast_types(&renamed)
}
