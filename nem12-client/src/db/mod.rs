pub mod meter_reading_sql;

pub use meter_reading_sql::{SqlEncode, CREATE_METER_READINGS_TABLE, METER_READINGS_TABLE};
