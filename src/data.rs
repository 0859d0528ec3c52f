//! Loader for the precomputed artifacts exported as a directory of CSV files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::archetype::Archetype;
use crate::dataset::Dataset;
use crate::error::{DashboardError, Result};
use crate::models::{CorrelationMap, EngagementVector, StudentRecord, SuccessTemplate};

pub const CLUSTER_DIR: &str = "cluster_results";
pub const RECOMMENDATION_DIR: &str = "recommendation_data";

pub const ASSIGNMENTS_FILE: &str = "cluster_assignments.csv";
pub const SUCCESS_RATES_FILE: &str = "archetype_success_rates.csv";
pub const INTERACTIONS_FILE: &str = "interaction_matrix_full.csv";
pub const TEMPLATES_FILE: &str = "success_templates_v2.csv";
pub const CORRELATIONS_FILE: &str = "activity_success_correlations.csv";

pub fn load_dir(root: &Path) -> Result<Dataset> {
    let cluster_dir = root.join(CLUSTER_DIR);
    let recommendation_dir = root.join(RECOMMENDATION_DIR);

    let students = load_students(&cluster_dir.join(ASSIGNMENTS_FILE))?;

    let engagement: IndexMap<String, EngagementVector> =
        read_wide_table(&recommendation_dir.join(INTERACTIONS_FILE))?
            .into_rows()
            .map(|(student_id, levels)| (student_id, levels.into_iter().collect()))
            .collect();

    let templates: IndexMap<Archetype, SuccessTemplate> =
        read_wide_table(&recommendation_dir.join(TEMPLATES_FILE))?
            .into_rows()
            .map(|(label, targets)| (Archetype::from(label), targets.into_iter().collect()))
            .collect();

    let correlations_path = recommendation_dir.join(CORRELATIONS_FILE);
    let correlations = if correlations_path.exists() {
        load_correlations(&correlations_path)?
    } else {
        warn!(path = %correlations_path.display(), "no activity correlations; scoring without them");
        None
    };

    let rates_path = cluster_dir.join(SUCCESS_RATES_FILE);
    let success_rates: HashMap<Archetype, f64> = if rates_path.exists() {
        read_single_column(&rates_path, "success_rate")?
            .unwrap_or_default()
            .into_iter()
            .map(|(label, rate)| (Archetype::from(label), rate))
            .collect()
    } else {
        HashMap::new()
    };

    let dataset = Dataset {
        students,
        engagement,
        templates,
        correlations,
        success_rates,
    };
    info!(
        root = %root.display(),
        students = dataset.students.len(),
        engagement_rows = dataset.engagement.len(),
        templates = dataset.templates.len(),
        correlations = dataset.correlations.as_ref().map_or(0, CorrelationMap::len),
        "loaded dataset"
    );
    Ok(dataset)
}

pub fn load_students(path: &Path) -> Result<Vec<StudentRecord>> {
    #[derive(Deserialize)]
    struct AssignmentRow {
        student_course_id: Option<String>,
        id_student: Option<String>,
        archetype: String,
        final_result: Option<String>,
    }

    let mut reader = open(path)?;
    let headers = reader.headers().map_err(|source| csv_error(path, source))?;
    let has = |name: &str| headers.iter().any(|h| h == name);
    if !has("student_course_id") && !has("id_student") {
        return Err(missing_column(path, "student_course_id"));
    }
    if !has("archetype") {
        return Err(missing_column(path, "archetype"));
    }

    let mut students = Vec::new();
    for result in reader.deserialize::<AssignmentRow>() {
        let row = result.map_err(|source| csv_error(path, source))?;
        let Some(student_id) = row.student_course_id.or(row.id_student) else {
            continue;
        };
        students.push(StudentRecord {
            student_id,
            archetype: Archetype::from(row.archetype),
            final_result: row.final_result.filter(|r| !r.is_empty()),
        });
    }
    Ok(students)
}

fn load_correlations(path: &Path) -> Result<Option<CorrelationMap>> {
    let Some(entries) = read_single_column(path, "correlation")? else {
        warn!(path = %path.display(), "correlation file has no `correlation` column; ignoring it");
        return Ok(None);
    };
    Ok(Some(entries.into_iter().collect()))
}

/// First column as the key, one named value column. `None` when the column is
/// absent.
fn read_single_column(path: &Path, column: &str) -> Result<Option<Vec<(String, f64)>>> {
    let table = read_wide_table(path)?;
    let Some(index) = table.columns.iter().position(|c| c == column) else {
        return Ok(None);
    };
    let entries = table
        .rows
        .into_iter()
        .filter_map(|(key, values)| values.get(index).copied().flatten().map(|v| (key, v)))
        .collect();
    Ok(Some(entries))
}

/// A CSV whose first column is a row label and whose remaining columns are
/// numeric.
struct WideTable {
    columns: Vec<String>,
    rows: Vec<(String, Vec<Option<f64>>)>,
}

impl WideTable {
    /// Rows as `(label, [(column, value)])`, skipping empty cells.
    fn into_rows(self) -> impl Iterator<Item = (String, Vec<(String, f64)>)> {
        let columns = self.columns;
        self.rows.into_iter().map(move |(label, values)| {
            let present = columns
                .iter()
                .zip(values)
                .filter_map(|(column, value)| value.map(|v| (column.clone(), v)))
                .collect();
            (label, present)
        })
    }
}

fn read_wide_table(path: &Path) -> Result<WideTable> {
    let mut reader = open(path)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| csv_error(path, source))?;
        let line = record.position().map_or(0, |p| p.line());
        let label = record.get(0).unwrap_or_default().to_string();

        let mut values = Vec::with_capacity(columns.len());
        for (column, cell) in columns.iter().zip(record.iter().skip(1)) {
            values.push(parse_cell(path, line, column, cell)?);
        }
        rows.push((label, values));
    }

    Ok(WideTable { columns, rows })
}

/// Empty and non-finite cells (`nan`, `-nan`, `inf`) count as missing.
fn parse_cell(path: &Path, line: u64, column: &str, cell: &str) -> Result<Option<f64>> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|value| value.is_finite().then_some(value))
        .map_err(|_| DashboardError::InvalidValue {
            path: path.to_path_buf(),
            line,
            column: column.to_string(),
            value: cell.to_string(),
        })
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

fn csv_error(path: &Path, source: csv::Error) -> DashboardError {
    DashboardError::Csv {
        path: PathBuf::from(path),
        source,
    }
}

fn missing_column(path: &Path, column: &str) -> DashboardError {
    DashboardError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}
