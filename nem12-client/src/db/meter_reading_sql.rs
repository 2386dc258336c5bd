use time::{error::Format, macros::format_description, PrimitiveDateTime};

use crate::domain::MeterReading;

pub const METER_READINGS_TABLE: &str = "meter_readings";

/// DDL for the table the insert statements target.
pub const CREATE_METER_READINGS_TABLE: &str = "create table if not exists meter_readings (\
nmi varchar(10) not null, \
timestamp timestamp not null, \
consumption numeric not null);";

/// Renders a value as a single SQL statement.
pub trait SqlEncode {
    fn write_insert(&self, out: &mut String) -> Result<(), Format>;

    fn to_sql(&self) -> Result<String, Format> {
        let mut s = String::with_capacity(128);
        self.write_insert(&mut s)?;
        Ok(s)
    }
}

/// Quote a string literal, doubling embedded single quotes.
fn push_sql_string(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
}

// `yyyy-mm-dd hh:mm:ss.f`, the form SQL timestamp columns accept as a literal.
fn push_sql_timestamp(out: &mut String, ts: PrimitiveDateTime) -> Result<(), Format> {
    let formatted = ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:1]"
    ))?;
    out.push('\'');
    out.push_str(&formatted);
    out.push('\'');
    Ok(())
}

impl SqlEncode for MeterReading {
    fn write_insert(&self, out: &mut String) -> Result<(), Format> {
        out.push_str("insert into ");
        out.push_str(METER_READINGS_TABLE);
        out.push_str(" (nmi, timestamp, consumption) values (");
        push_sql_string(out, &self.nmi);
        out.push_str(", ");
        push_sql_timestamp(out, self.timestamp)?;
        out.push_str(", ");
        // BigDecimal keeps the source scale, so the literal is exact.
        out.push_str(&self.consumption.to_string());
        out.push_str(");");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use time::macros::datetime;

    fn reading(nmi: &str, consumption: &str) -> MeterReading {
        MeterReading::new(
            nmi,
            datetime!(2024-03-20 15:05),
            BigDecimal::from_str(consumption).unwrap(),
        )
    }

    #[test]
    fn renders_insert_statement() {
        assert_eq!(
            reading("test", "3.51").to_sql().unwrap(),
            "insert into meter_readings (nmi, timestamp, consumption) values ('test', '2024-03-20 15:05:00.0', 3.51);"
        );
    }

    #[test]
    fn keeps_decimal_scale() {
        let sql = reading("NEM1201009", "0.460").to_sql().unwrap();
        assert!(sql.ends_with(", 0.460);"), "{sql}");
    }

    #[test]
    fn escapes_quotes_in_nmi() {
        let sql = reading("O'NEIL", "1").to_sql().unwrap();
        assert!(sql.contains("values ('O''NEIL', "), "{sql}");
    }

    #[test]
    fn renders_midnight_and_sub_second_timestamps() {
        let midnight = MeterReading::new("NEM1201009", datetime!(2005-03-02 00:00), BigDecimal::from(0));
        assert!(midnight.to_sql().unwrap().contains("'2005-03-02 00:00:00.0'"));

        let fractional = MeterReading::new("NEM1201009", datetime!(2005-03-02 00:00:07.25), BigDecimal::from(0));
        assert!(fractional.to_sql().unwrap().contains("'2005-03-02 00:00:07.2'"));
    }

    #[test]
    fn write_insert_appends() {
        let mut out = String::from("-- batch\n");
        reading("a", "0").write_insert(&mut out).unwrap();
        assert!(out.starts_with("-- batch\ninsert into meter_readings"));
    }
}
