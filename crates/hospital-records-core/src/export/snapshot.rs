//! Full-table snapshot written as CSV.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use thiserror::Error;

use crate::db::{Database, DbError};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Extraction failed: {0}")]
    Database(#[from] DbError),

    #[error("Failed to write snapshot to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<rusqlite::Error> for ExportError {
    fn from(e: rusqlite::Error) -> Self {
        ExportError::Database(DbError::Sqlite(e))
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// A single value read from the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
        }
    }
}

impl Cell {
    /// Render as an (unescaped) CSV field. Null is empty.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Integer(i) => i.to_string(),
            // Debug keeps the trailing ".0" on whole amounts
            Cell::Real(f) => format!("{:?}", f),
            Cell::Text(s) => s.clone(),
            Cell::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// In-memory copy of the patient table.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Column names in table order
    pub columns: Vec<String>,
    /// One entry per row, each as wide as `columns`
    pub rows: Vec<Vec<Cell>>,
}

impl Snapshot {
    /// Read every patient row, unfiltered.
    pub fn read(db: &Database) -> ExportResult<Self> {
        let mut stmt = db.conn().prepare("SELECT * FROM patient ORDER BY id")?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Cell::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, rows })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Export to CSV format: header row, then one line per row.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        let header: Vec<String> = self.columns.iter().map(|c| escape_csv(c)).collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        // Lines
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|cell| escape_csv(&cell.render())).collect();
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        csv
    }
}

/// Hook for reshaping a snapshot between the read and the write.
pub trait SnapshotTransform: Send + Sync {
    fn apply(&self, snapshot: Snapshot) -> Snapshot;
}

/// Writes the snapshot exactly as read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransform;

impl SnapshotTransform for NoTransform {
    fn apply(&self, snapshot: Snapshot) -> Snapshot {
        snapshot
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Data rows written (excluding the header)
    pub rows: usize,
    /// File that was written
    pub output: PathBuf,
}

/// Reads the patient table and writes it to a CSV file.
#[derive(Debug, Clone, Default)]
pub struct SnapshotExporter<T = NoTransform> {
    transform: T,
}

impl SnapshotExporter {
    /// Create an exporter with no transformation step.
    pub fn new() -> Self {
        Self {
            transform: NoTransform,
        }
    }
}

impl<T: SnapshotTransform> SnapshotExporter<T> {
    /// Create an exporter that reshapes the snapshot before writing.
    pub fn with_transform(transform: T) -> Self {
        Self { transform }
    }

    /// Run one extraction from `db_path` into `output`, replacing any prior file.
    ///
    /// The connection is closed whether or not the read succeeds.
    pub fn export(&self, db_path: &Path, output: &Path) -> ExportResult<ExportReport> {
        let db = Database::open_read_only(db_path)?;
        let read = Snapshot::read(&db);
        let closed = db.close();
        let snapshot = read?;
        closed?;

        let snapshot = self.transform.apply(snapshot);
        write_replacing(output, &snapshot.to_csv())?;

        tracing::info!(
            rows = snapshot.len(),
            output = %output.display(),
            "patient snapshot written"
        );

        Ok(ExportReport {
            rows: snapshot.len(),
            output: output.to_path_buf(),
        })
    }
}

/// Write through a sibling temp file so readers never see a partial snapshot.
fn write_replacing(path: &Path, contents: &str) -> ExportResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    fs::rename(&tmp, path).map_err(io_err)
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
