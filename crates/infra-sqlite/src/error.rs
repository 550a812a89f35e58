// sqlx error mapping
// sqlx::Error cannot implement From for AppError here (orphan rule), hence helpers

use cadence_core::error::AppError;
use cadence_core::port::UnitError;

/// Readable description of a sqlx error, keeping SQLite result codes visible
fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            match db_err.code() {
                Some(code) => match code.as_ref() {
                    "2067" | "1555" => format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code
                    ),
                    "787" | "3850" => format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code
                    ),
                    "5" => format!("Database locked (SQLITE_BUSY): {}", db_err.message()),
                    "13" => format!("Database full: {}", db_err.message()),
                    other => format!("[{}] {}", other, db_err.message()),
                },
                None => db_err.message().to_string(),
            }
        }
        sqlx::Error::RowNotFound => "Row not found".to_string(),
        sqlx::Error::ColumnNotFound(col) => format!("Column not found: {}", col),
        // Connection, pool, protocol errors
        other => other.to_string(),
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    AppError::Database(describe(&err))
}

/// Same mapping for errors raised inside a process unit attempt
pub(crate) fn unit_sqlx_error(err: sqlx::Error) -> UnitError {
    UnitError::Database(describe(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), "Database error: Row not found");

        let err = unit_sqlx_error(sqlx::Error::ColumnNotFound("status".to_string()));
        assert_eq!(err, UnitError::Database("Column not found: status".to_string()));
    }
}
