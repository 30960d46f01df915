//! Output formatting for CLI commands.
//!
//! Supports compact (`short`), detailed (`long`) and JSON output.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use ctx_context::ContextError;
use serde::Serialize;

use crate::error::CliError;

/// Output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// One header row and one row per cluster.
    Short,
    /// Sectioned human-readable report.
    #[default]
    Long,
    /// Pretty-printed JSON of the snapshot.
    Json,
}

impl OutputEncoding {
    /// Returns the flag value for this encoding.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputEncoding {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            "json" => Ok(Self::Json),
            other => Err(ContextError::invalid_configuration(format!(
                "unknown output format: {other}"
            ))),
        }
    }
}

/// Knobs for the detailed view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailOptions {
    /// Show summaries, severities and incident details.
    pub verbose: bool,
    /// The audit trail was requested.
    pub audit_trail: bool,
}

/// Output formatter dispatching on [`OutputEncoding`].
#[derive(Debug, Clone, Default)]
pub struct OutputFormat {
    encoding: OutputEncoding,
    options: DetailOptions,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(encoding: OutputEncoding) -> Self {
        Self {
            encoding,
            options: DetailOptions {
                verbose: false,
                audit_trail: false,
            },
        }
    }

    /// Sets the detailed-view options.
    #[must_use]
    pub const fn with_options(mut self, options: DetailOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the current encoding.
    #[must_use]
    pub const fn encoding(&self) -> OutputEncoding {
        self.encoding
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.encoding, OutputEncoding::Json)
    }

    /// Write a value in the selected encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + ReportDisplay,
    {
        match self.encoding {
            OutputEncoding::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            OutputEncoding::Short => value.write_compact(writer)?,
            OutputEncoding::Long => value.write_detailed(writer, &self.options)?,
        }
        Ok(())
    }

    /// Write a value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + ReportDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

/// Types with a compact and a detailed text form.
pub trait ReportDisplay {
    /// Writes the one-row-per-item table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_compact<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;

    /// Writes the sectioned report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_detailed<W: Write>(&self, writer: &mut W, options: &DetailOptions)
    -> Result<(), CliError>;
}

/// Writes rows as space-padded columns sized to the widest cell.
pub(crate) fn write_columns<W: Write>(
    writer: &mut W,
    rows: &[Vec<String>],
) -> Result<(), CliError> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}
