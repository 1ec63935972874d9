//! Short, user-facing messages for library errors.
//!
//! Matches on error variants and io::ErrorKind instead of parsing strings.

use std::io;

use polars::prelude::PolarsError;

use crate::error::CombineError;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!("Duplicate column name: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Column types do not line up: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => first_line(msg),
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        #[allow(unreachable_patterns)]
        _ => first_line(&err.to_string()),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => "Invalid or corrupted data.".to_string(),
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::IsADirectory => "Path is a directory, not a file.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by walking its cause chain for PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(pe);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }
    first_line(&report.to_string())
}

/// Validation and size failures already read well; polars failures get cleaned up.
pub fn user_message_from_combine(err: &CombineError) -> String {
    match err {
        CombineError::Polars { operation, source } => {
            format!("{} failed: {}", operation, user_message_from_polars(source))
        }
        other => other.to_string(),
    }
}

fn first_line(msg: &str) -> String {
    msg.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("An error occurred")
        .to_string()
}
