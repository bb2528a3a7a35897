//! Date/time functions
//!
//! Dates are Excel serial numbers: whole days since 1899-12-30, with the
//! time of day as the fractional part. For serials from 61 (1900-03-01)
//! onwards this agrees with Excel's 1900 date system.

use super::number_arg;
use crate::error::{ExcelError, FormulaResult};
use crate::evaluator::FormulaValue;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial of 9999-12-31, the last date Excel represents
pub const MAX_SERIAL: f64 = 2_958_465.0;

fn epoch() -> FormulaResult<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30).ok_or(ExcelError::Num)
}

/// Serial number of a calendar date
pub fn date_to_serial(date: NaiveDate) -> FormulaResult<f64> {
    Ok((date - epoch()?).num_days() as f64)
}

/// Serial number of a date and time
pub fn datetime_to_serial(datetime: NaiveDateTime) -> FormulaResult<f64> {
    let day = date_to_serial(datetime.date())?;
    Ok(day + datetime.time().num_seconds_from_midnight() as f64 / SECONDS_PER_DAY)
}

/// Calendar date of a serial number (the time part is dropped)
pub fn serial_to_date(serial: f64) -> FormulaResult<NaiveDate> {
    if !(0.0..=MAX_SERIAL).contains(&serial) {
        return Err(ExcelError::Num);
    }
    let days = Duration::try_days(serial.trunc() as i64).ok_or(ExcelError::Num)?;
    epoch()?.checked_add_signed(days).ok_or(ExcelError::Num)
}

/// TODAY function
pub fn fn_today(_args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(date_to_serial(Local::now().date_naive())?))
}

/// NOW function
pub fn fn_now(_args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(datetime_to_serial(
        Local::now().naive_local(),
    )?))
}

fn date_part(args: &[FormulaValue], part: fn(&NaiveDate) -> u32) -> FormulaResult<FormulaValue> {
    let date = serial_to_date(number_arg(args, 0, 0.0)?)?;
    Ok(FormulaValue::Number(part(&date) as f64))
}

/// YEAR function
pub fn fn_year(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    let date = serial_to_date(number_arg(args, 0, 0.0)?)?;
    Ok(FormulaValue::Number(date.year() as f64))
}

/// MONTH function
pub fn fn_month(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    date_part(args, |d| d.month())
}

/// DAY function
pub fn fn_day(args: &[FormulaValue]) -> FormulaResult<FormulaValue> {
    date_part(args, |d| d.day())
}
