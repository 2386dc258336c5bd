pub mod db;
pub mod domain;
pub mod parser;

pub use domain::MeterReading;
pub use parser::{Nem12Parser, ParserError};
