//! Positional CSV loading into observations
//!
//! Rows are mapped by position against a [`Schema`]; header names are never
//! consulted except to recognise and skip a header row. The first malformed
//! row aborts the whole load.

use super::observation::{ColumnKind, Delimiter, Observation, Schema};
use crate::error::{CreditScoreError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// CSV reader bound to a schema
#[derive(Debug, Clone)]
pub struct CsvLoader {
    schema: Schema,
    delimiter: Delimiter,
    limit: Option<usize>,
}

impl CsvLoader {
    /// Create a loader for the given schema, comma-delimited by default
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            delimiter: Delimiter::Comma,
            limit: None,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Stop after `limit` observations; 0 reads everything
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Load every observation in the file at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Observation>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let observations = self.load_from_reader(file)?;
        debug!(path = %path.display(), rows = observations.len(), "loaded observations");
        Ok(observations)
    }

    /// Load observations from any reader
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Vec<Observation>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(self.delimiter.as_byte())
            .from_reader(reader);

        let mut observations = Vec::new();
        let mut record = StringRecord::new();

        while csv_reader.read_record(&mut record)? {
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.get(0) == Some(self.schema.first_column()) {
                continue;
            }

            observations.push(self.parse_record(&record, line)?);

            if let Some(limit) = self.limit {
                if observations.len() >= limit {
                    break;
                }
            }
        }

        Ok(observations)
    }

    fn parse_record(&self, record: &StringRecord, line: u64) -> Result<Observation> {
        let expected = self.schema.len();
        if record.len() < expected {
            return Err(CreditScoreError::parse(
                line,
                self.schema.columns()[record.len()].name.clone(),
                format!("row has {} fields, schema requires {}", record.len(), expected),
            ));
        }
        if record.len() > expected {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} fields", expected),
                actual: format!("{} fields at line {}", record.len(), line),
            });
        }

        let mut ratios = Vec::with_capacity(self.schema.n_numeric());
        let mut cnae = String::new();
        let mut label = false;

        for (spec, field) in self.schema.columns().iter().zip(record.iter()) {
            match spec.kind {
                ColumnKind::Numeric => ratios.push(parse_ratio(field, line, &spec.name)?),
                ColumnKind::Categorical => cnae = field.to_string(),
                ColumnKind::Label => label = parse_label(field, line, &spec.name)?,
            }
        }

        Ok(Observation { ratios, cnae, label })
    }
}

/// Parse a ratio with the invariant decimal format. Empty, `?` and `NaN`
/// tokens are missing values.
pub fn parse_ratio(field: &str, line: u64, column: &str) -> Result<f64> {
    if field.is_empty() || field == "?" || field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }

    let value: f64 = field.parse().map_err(|_| {
        CreditScoreError::parse(line, column, format!("'{}' is not a number", field))
    })?;

    if value.is_infinite() {
        return Err(CreditScoreError::parse(
            line,
            column,
            format!("'{}' is not finite", field),
        ));
    }

    Ok(value)
}

/// Parse an outcome token: nonzero integers are `true`
pub fn parse_label(field: &str, line: u64, column: &str) -> Result<bool> {
    if let Ok(v) = field.parse::<i64>() {
        return Ok(v != 0);
    }
    if let Ok(v) = field.parse::<f64>() {
        if v.is_finite() {
            return Ok(v != 0.0);
        }
    }
    match field.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CreditScoreError::parse(
            line,
            column,
            format!("'{}' is not a label", field),
        )),
    }
}

/// Load every observation of `path` with the given delimiter and schema
pub fn load_observations(
    path: impl AsRef<Path>,
    delimiter: Delimiter,
    schema: &Schema,
) -> Result<Vec<Observation>> {
    CsvLoader::new(schema.clone())
        .with_delimiter(delimiter)
        .load(path)
}

/// Load at most `limit` observations (0 = all) for scoring previews
pub fn read_sample(
    path: impl AsRef<Path>,
    delimiter: Delimiter,
    schema: &Schema,
    limit: usize,
) -> Result<Vec<Observation>> {
    CsvLoader::new(schema.clone())
        .with_delimiter(delimiter)
        .with_limit(limit)
        .load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "V1,V2,V3,V4,V5,V6,V7,V8,V9,V10,V11,V12,V13,CNAE,Label\n";

    fn loader() -> CsvLoader {
        CsvLoader::new(Schema::credit_scoring())
    }

    #[test]
    fn test_load_skips_header() {
        let csv = format!(
            "{}0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,0.9,1.0,1.1,1.2,1.3,4321,1\n\
             1,2,3,4,5,6,7,8,9,10,11,12,13,4110,0\n",
            HEADER
        );
        let rows = loader().load_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ratios.len(), 13);
        assert_eq!(rows[0].cnae, "4321");
        assert!(rows[0].label);
        assert!(!rows[1].label);
        assert_eq!(rows[1].ratios[12], 13.0);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let csv = "1;2;3;4;5;6;7;8;9;10;11;12;13;A;2\n";
        let rows = loader()
            .with_delimiter(Delimiter::Semicolon)
            .load_from_reader(csv.as_bytes())
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cnae, "A");
        assert!(rows[0].label, "nonzero label maps to true");
    }

    #[test]
    fn test_short_row_fails() {
        let csv = "1,2,3,4,5,6,7,8,9,10,11,12,13,A,1\n1,2,3\n";
        let err = loader().load_from_reader(csv.as_bytes()).unwrap_err();

        match err {
            CreditScoreError::ParseError { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "V4");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_number_fails_fast() {
        let csv = "1,2,abc,4,5,6,7,8,9,10,11,12,13,A,1\n1,2,3,4,5,6,7,8,9,10,11,12,13,A,1\n";
        let result = loader().load_from_reader(csv.as_bytes());
        assert!(matches!(result, Err(CreditScoreError::ParseError { .. })));
    }

    #[test]
    fn test_locale_decimal_comma_rejected() {
        let csv = "1;2,5;3;4;5;6;7;8;9;10;11;12;13;A;1\n";
        let result = loader()
            .with_delimiter(Delimiter::Semicolon)
            .load_from_reader(csv.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_value_is_nan() {
        let csv = "1,,3,4,5,6,7,8,9,10,11,12,13,A,0\n";
        let rows = loader().load_from_reader(csv.as_bytes()).unwrap();
        assert!(rows[0].ratios[1].is_nan());
    }

    #[test]
    fn test_extra_fields_are_schema_mismatch() {
        let csv = "1,2,3,4,5,6,7,8,9,10,11,12,13,A,0,99\n";
        let result = loader().load_from_reader(csv.as_bytes());
        assert!(matches!(result, Err(CreditScoreError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_limit() {
        let csv = "1,2,3,4,5,6,7,8,9,10,11,12,13,A,0\n\
                   1,2,3,4,5,6,7,8,9,10,11,12,13,B,1\n\
                   1,2,3,4,5,6,7,8,9,10,11,12,13,C,1\n";
        let rows = loader().with_limit(2).load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_label_tokens() {
        assert!(parse_label("1", 1, "Label").unwrap());
        assert!(!parse_label("0", 1, "Label").unwrap());
        assert!(parse_label("-3", 1, "Label").unwrap());
        assert!(parse_label("true", 1, "Label").unwrap());
        assert!(parse_label("yes", 1, "Label").is_err());
    }
}
