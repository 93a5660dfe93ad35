//! Lab analytics JSON to `labs_core` converter.
//!
//! Both endpoints return loosely shaped payloads. Everything is normalized here
//! so the core only ever sees strict `CategoryTree` and `AnalyteSeries` values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use labs_core::{
    AnalytePoint, AnalyteSeries, AnalyteSummary, CategoryTree, LabCategory, LabFlag, LabsError,
    PointId,
};
use serde_json::Value;

/// Parse the `GET /labs/analytes` payload from a JSON string.
pub fn parse_catalog_str(catalog_json: &str) -> Result<CategoryTree, LabsError> {
    let value: Value =
        serde_json::from_str(catalog_json).map_err(|err| LabsError::Parse(err.to_string()))?;
    parse_catalog_value(&value)
}

/// Parse the `GET /labs/analytes` payload from a `serde_json::Value`.
pub fn parse_catalog_value(catalog: &Value) -> Result<CategoryTree, LabsError> {
    let categories = match catalog.get("categories") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Err(LabsError::MissingData),
        Some(other) => {
            return Err(LabsError::Parse(format!(
                "Expected categories to be an array, received {}",
                json_kind(other)
            )))
        }
    };

    let categories = categories
        .iter()
        .filter_map(|category| {
            let name = non_empty_str(category.get("name"))?;
            let analytes = category
                .get("analytes")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(parse_analyte_summary).collect())
                .unwrap_or_default();
            Some(LabCategory { name, analytes })
        })
        .collect::<Vec<_>>();

    tracing::debug!(categories = categories.len(), "catalog payload normalized");
    Ok(CategoryTree { categories })
}

fn parse_analyte_summary(value: &Value) -> Option<AnalyteSummary> {
    let canonical_name = non_empty_str(value.get("canonical_name"))?;
    let measurement_count = value
        .get("count")
        .and_then(Value::as_u64)
        .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
        .unwrap_or(0);

    Some(AnalyteSummary {
        canonical_name,
        standard_unit: non_empty_str(value.get("standard_unit")),
        measurement_count,
    })
}

/// Parse the `GET /labs/timeseries` payload from a JSON string.
pub fn parse_series_str(series_json: &str) -> Result<AnalyteSeries, LabsError> {
    let value: Value =
        serde_json::from_str(series_json).map_err(|err| LabsError::Parse(err.to_string()))?;
    parse_series_value(&value)
}

/// Parse the `GET /labs/timeseries` payload from a `serde_json::Value`.
///
/// Points without a date or numeric value are kept; the core decides what is
/// plottable. Non-object entries are skipped but still consume an index so
/// derived ids stay stable.
pub fn parse_series_value(series: &Value) -> Result<AnalyteSeries, LabsError> {
    let analyte_name = non_empty_str(series.get("analyte")).ok_or(LabsError::MissingData)?;

    let raw_points: &[Value] = match series.get("points") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(LabsError::Parse(format!(
                "Expected points to be an array, received {}",
                json_kind(other)
            )))
        }
    };

    let points: Vec<_> = raw_points
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| normalize_point(raw, index))
        .collect();

    let unplottable = points.iter().filter(|point| !point.is_plottable()).count();
    if unplottable > 0 {
        tracing::debug!(
            analyte = %analyte_name,
            unplottable,
            "series contains points without date or numeric value"
        );
    }

    Ok(AnalyteSeries {
        analyte_name,
        category: non_empty_str(series.get("category")),
        standard_unit: non_empty_str(series.get("standard_unit")),
        points,
    })
}

fn normalize_point(raw: &Value, index: usize) -> Option<AnalytePoint> {
    if !raw.is_object() {
        tracing::debug!(index, "skipping non-object series point");
        return None;
    }

    let document_id = non_empty_str(raw.get("document_id"));
    let raw_date = raw.get("date").and_then(Value::as_str);
    let raw_value = raw.get("value_num");

    let id = derive_point_id(document_id.as_deref(), raw_date, raw_value, index);

    Some(AnalytePoint {
        id,
        date: raw_date.and_then(parse_datetime),
        value: raw_value.and_then(parse_numeric),
        unit: non_empty_str(raw.get("unit")),
        reference_range: non_empty_str(raw.get("reference_range")),
        flag: raw
            .get("flag")
            .and_then(Value::as_str)
            .and_then(LabFlag::from_code),
        document_id,
    })
}

/// Build the positional point id `"{document}_{date}_{value}_{index}"`.
///
/// The backend does not assign ids to lab results, so the id is derived from
/// the raw payload. Missing parts become `unknown`, `nodate` and `novalue`.
pub fn derive_point_id(
    document_id: Option<&str>,
    raw_date: Option<&str>,
    raw_value: Option<&Value>,
    index: usize,
) -> PointId {
    let document = document_id.filter(|s| !s.is_empty()).unwrap_or("unknown");
    let date = raw_date.filter(|s| !s.is_empty()).unwrap_or("nodate");
    let value = match raw_value {
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|n| n.to_string())
            .unwrap_or_else(|| number.to_string()),
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        _ => "novalue".to_string(),
    };
    PointId::new(format!("{document}_{date}_{value}_{index}"))
}

fn parse_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Accepts RFC 3339, naive date-times (treated as UTC), ISO dates and `dd.mm.yyyy`.
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(naive.and_utc());
        }
    }

    for pattern in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
