//! Observation records and the positional schema they are read with

use crate::error::{CreditScoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a column plays in the record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Floating-point financial ratio
    Numeric,
    /// Free-form categorical code, featurized as text
    Categorical,
    /// Boolean outcome
    Label,
}

/// A named column at a fixed position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column layout. Position is the contract; headers are never used
/// for mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Build a schema from numeric columns followed by one categorical
    /// column and the label.
    pub fn new(numeric: &[String], categorical: &str, label: &str) -> Result<Self> {
        if numeric.is_empty() {
            return Err(CreditScoreError::ConfigError(
                "schema needs at least one numeric column".to_string(),
            ));
        }

        let mut columns: Vec<ColumnSpec> = numeric
            .iter()
            .map(|name| ColumnSpec::new(name.clone(), ColumnKind::Numeric))
            .collect();
        columns.push(ColumnSpec::new(categorical, ColumnKind::Categorical));
        columns.push(ColumnSpec::new(label, ColumnKind::Label));

        let mut names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != columns.len() {
            return Err(CreditScoreError::ConfigError(
                "schema column names must be unique".to_string(),
            ));
        }

        Ok(Self { columns })
    }

    /// The 15-column credit layout: `V1..V13, CNAE, Label`
    pub fn credit_scoring() -> Self {
        let mut columns: Vec<ColumnSpec> = (1..=13)
            .map(|i| ColumnSpec::new(format!("V{}", i), ColumnKind::Numeric))
            .collect();
        columns.push(ColumnSpec::new("CNAE", ColumnKind::Categorical));
        columns.push(ColumnSpec::new("Label", ColumnKind::Label));
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Name of the first column, used to recognise header rows
    pub fn first_column(&self) -> &str {
        self.columns.first().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn numeric_names(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Numeric)
    }

    pub fn n_numeric(&self) -> usize {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Numeric).count()
    }

    pub fn categorical_name(&self) -> &str {
        self.names_of(ColumnKind::Categorical).first().copied().unwrap_or("")
    }

    pub fn label_name(&self) -> &str {
        self.names_of(ColumnKind::Label).first().copied().unwrap_or("")
    }

    fn names_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::credit_scoring()
    }
}

/// One company-year financial record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Ratios in schema order; NaN marks a missing value
    pub ratios: Vec<f64>,
    /// Raw industry code token
    pub cnae: String,
    /// Bankruptcy / failure within the horizon
    pub label: bool,
}

impl Observation {
    pub fn new(ratios: Vec<f64>, cnae: impl Into<String>, label: bool) -> Self {
        Self {
            ratios,
            cnae: cnae.into(),
            label,
        }
    }
}

/// Field separator of a source CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Comma
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

impl FromStr for Delimiter {
    type Err = CreditScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            other => Err(CreditScoreError::InvalidParameter {
                name: "delimiter".to_string(),
                value: other.to_string(),
                reason: "expected ',' or ';'".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_schema_layout() {
        let schema = Schema::credit_scoring();
        assert_eq!(schema.len(), 15);
        assert_eq!(schema.first_column(), "V1");
        assert_eq!(schema.n_numeric(), 13);
        assert_eq!(schema.categorical_name(), "CNAE");
        assert_eq!(schema.label_name(), "Label");
        assert_eq!(schema.columns()[13].kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let numeric = vec!["V1".to_string(), "V1".to_string()];
        assert!(Schema::new(&numeric, "CNAE", "Label").is_err());
    }

    #[test]
    fn test_delimiter_parse() {
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::Semicolon);
        assert_eq!("comma".parse::<Delimiter>().unwrap(), Delimiter::Comma);
        assert!("|".parse::<Delimiter>().is_err());
    }
}
