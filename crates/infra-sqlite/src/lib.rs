// Cadence Infrastructure - SQLite Adapter
// Implements: ReportSink (cycle history), history queries, database process units

mod connection;
mod error;
mod history;
mod migration;
mod report_sink;
mod units;

pub use connection::create_pool;
pub use history::{HistoryStats, SqliteHistory};
pub use migration::{current_version, run_migrations};
pub use report_sink::SqliteReportSink;
pub use units::{PruneHistoryUnit, SqlStatementUnit};
