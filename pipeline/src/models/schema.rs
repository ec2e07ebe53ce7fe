use arrow::datatypes::{DataType, Field, Schema};

pub const MEAL_COUNT: &str = "meal_count";
pub const AVERAGE_DAILY_ATTENDANCE: &str = "average_daily_attendance";
pub const SCHOOL_TYPE: &str = "school_type";
pub const CITY: &str = "city";
pub const AS_OF_DATE: &str = "as_of_date";

pub const MONTH: &str = "month";
pub const TOTAL_MEAL_COUNT: &str = "total_meal_count";
pub const TOTAL_ATTENDANCE: &str = "total_attendance";

/// Numeric fields coerced and imputed by the cleaner.
pub const NUMERIC_FIELDS: [&str; 2] = [MEAL_COUNT, AVERAGE_DAILY_ATTENDANCE];

/// Categorical fields folded to lowercase and trimmed by the cleaner.
pub const NORMALIZED_FIELDS: [&str; 2] = [SCHOOL_TYPE, CITY];

/// Placeholder written into a missing `school_type`.
pub const UNKNOWN_SCHOOL_TYPE: &str = "Desconhecido";

pub fn summary_schema() -> Schema {
    Schema::new(vec![
        Field::new(CITY, DataType::Utf8, false),
        Field::new(SCHOOL_TYPE, DataType::Utf8, false),
        Field::new(MONTH, DataType::UInt32, false),
        Field::new(TOTAL_MEAL_COUNT, DataType::Float64, false),
        Field::new(TOTAL_ATTENDANCE, DataType::Float64, false),
    ])
}

/// Data type a cleaned batch carries for one of the fields the cleaner owns.
pub fn cleaned_type(field: &str) -> Option<DataType> {
    match field {
        MEAL_COUNT | AVERAGE_DAILY_ATTENDANCE => Some(DataType::Float64),
        AS_OF_DATE => Some(DataType::Date32),
        SCHOOL_TYPE | CITY => Some(DataType::Utf8),
        _ => None,
    }
}
