pub mod sql_statements;

pub use sql_statements::SqlStatementSink;
