//! Schema unifier - versioned relation schemas and retroactive widening.
//!
//! A relation's schema only ever grows: widening adds columns, never removes
//! or retypes one. `widen` returns a new schema value (with a bumped version
//! when anything was added) instead of mutating in place, so each widening
//! step is auditable on its own. Same-name columns with conflicting types
//! across batches are a documented limitation and are not coerced; the
//! vstack at append time surfaces them as an error.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: DataType,
}

/// Ordered column set of one relation, with an explicit version that bumps
/// on every widening.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSchema {
    pub version: u32,
    pub columns: Vec<ColumnSpec>,
}

/// What a widening step did, for logging and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchemaEvolution {
    NoChange,
    AddColumns { added: Vec<String>, new_version: u32 },
}

impl RelationSchema {
    /// Schema of an existing frame, version 1.
    pub fn of(df: &DataFrame) -> Self {
        Self::with_version(df, 1)
    }

    pub fn with_version(df: &DataFrame, version: u32) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|s| ColumnSpec {
                name: s.name().to_string(),
                dtype: s.dtype().clone(),
            })
            .collect();
        Self { version, columns }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns of `incoming` that this schema lacks.
    pub fn missing_from(&self, incoming: &RelationSchema) -> Vec<ColumnSpec> {
        incoming
            .columns
            .iter()
            .filter(|c| !self.contains(&c.name))
            .cloned()
            .collect()
    }

    /// Reconcile an incoming batch schema against this one. Existing columns
    /// keep their position and type; columns new to the relation are appended.
    /// Returns the (possibly) widened schema and the evolution that produced
    /// it.
    pub fn widen(&self, incoming: &RelationSchema) -> (RelationSchema, SchemaEvolution) {
        let added = self.missing_from(incoming);
        if added.is_empty() {
            return (self.clone(), SchemaEvolution::NoChange);
        }
        let mut columns = self.columns.clone();
        let added_names: Vec<String> = added.iter().map(|c| c.name.clone()).collect();
        columns.extend(added);
        let widened = RelationSchema {
            version: self.version + 1,
            columns,
        };
        let evolution = SchemaEvolution::AddColumns {
            added: added_names,
            new_version: widened.version,
        };
        (widened, evolution)
    }

    /// Null-fill `df` so it carries every column of this schema, in this
    /// schema's order. Existing rows get typed nulls for the added columns.
    pub fn null_fill(&self, mut df: DataFrame) -> Result<DataFrame> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for spec in &self.columns {
            if !present.iter().any(|n| n == &spec.name) {
                df.with_column(Series::full_null(&spec.name, df.height(), &spec.dtype))?;
            }
        }
        Ok(df.select(self.column_names())?)
    }

    /// Project a batch onto this schema's column order: matching columns pass
    /// through untouched, columns the batch lacks become typed null series.
    pub fn project(&self, batch: &DataFrame) -> Result<DataFrame> {
        let height = batch.height();
        let mut series = Vec::with_capacity(self.columns.len());
        for spec in &self.columns {
            match batch.column(&spec.name) {
                Ok(s) => series.push(s.clone()),
                Err(_) => series.push(Series::full_null(&spec.name, height, &spec.dtype)),
            }
        }
        Ok(DataFrame::new(series)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_adds_and_bumps_version() {
        let target = df!["X" => [1i64], "Y" => ["a"]].unwrap();
        let batch = df!["X" => [2i64], "Y" => ["b"], "Z" => [1.5f64]].unwrap();
        let (widened, evolution) =
            RelationSchema::of(&target).widen(&RelationSchema::of(&batch));
        assert_eq!(widened.version, 2);
        assert_eq!(widened.column_names(), vec!["X", "Y", "Z"]);
        match evolution {
            SchemaEvolution::AddColumns { added, new_version } => {
                assert_eq!(added, vec!["Z".to_string()]);
                assert_eq!(new_version, 2);
            }
            SchemaEvolution::NoChange => panic!("expected AddColumns"),
        }
    }

    #[test]
    fn test_widen_no_change_keeps_version() {
        let target = df!["X" => [1i64], "Y" => ["a"]].unwrap();
        let batch = df!["Y" => ["b"]].unwrap();
        let (widened, evolution) =
            RelationSchema::of(&target).widen(&RelationSchema::of(&batch));
        assert_eq!(widened.version, 1);
        assert!(matches!(evolution, SchemaEvolution::NoChange));
    }

    #[test]
    fn test_project_synthesizes_typed_nulls() {
        let target = df!["X" => [1i64], "Y" => ["a"], "Z" => [1.5f64]].unwrap();
        let schema = RelationSchema::of(&target);
        let batch = df!["Y" => ["b", "c"]].unwrap();
        let projected = schema.project(&batch).unwrap();
        assert_eq!(projected.get_column_names(), vec!["X", "Y", "Z"]);
        assert_eq!(projected.column("X").unwrap().null_count(), 2);
        assert_eq!(projected.column("X").unwrap().dtype(), &DataType::Int64);
        assert_eq!(projected.column("Z").unwrap().dtype(), &DataType::Float64);
        assert_eq!(projected.column("Y").unwrap().null_count(), 0);
    }

    #[test]
    fn test_null_fill_preserves_existing_rows() {
        let target = df!["X" => [1i64, 2]].unwrap();
        let batch = df!["X" => [3i64], "Z" => ["z"]].unwrap();
        let (widened, _) = RelationSchema::of(&target).widen(&RelationSchema::of(&batch));
        let filled = widened.null_fill(target).unwrap();
        assert_eq!(filled.get_column_names(), vec!["X", "Z"]);
        assert_eq!(filled.column("Z").unwrap().null_count(), 2);
        assert_eq!(filled.column("X").unwrap().null_count(), 0);
    }
}
