//! Bridge WASM <-> JavaScript trung lập framework.

use labs_core::{
    CatalogState, CatalogView, ExclusionSet, Insets, LabsConfig, LabsError, PointId,
    SeriesReport,
};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Cấu hình từ phía JS; trường nào thiếu thì giữ giá trị mặc định.
#[derive(Deserialize)]
struct JsLabsConfig {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    insets: Option<Insets>,
    #[serde(default)]
    value_padding_ratio: Option<f64>,
    #[serde(default)]
    flat_padding: Option<f64>,
    #[serde(default)]
    deviation_threshold_percent: Option<f64>,
    #[serde(default)]
    y_grid_lines: Option<usize>,
    #[serde(default)]
    max_x_grid_lines: Option<usize>,
    #[serde(default)]
    hover_radius: Option<f64>,
    #[serde(default)]
    date_format: Option<String>,
}

impl From<JsLabsConfig> for LabsConfig {
    fn from(cfg: JsLabsConfig) -> Self {
        let mut base = LabsConfig::default();
        if let Some(width) = cfg.width {
            base.width = width;
        }
        if let Some(height) = cfg.height {
            base.height = height;
        }
        if let Some(insets) = cfg.insets {
            base.insets = insets;
        }
        if let Some(ratio) = cfg.value_padding_ratio {
            base.value_padding_ratio = ratio;
        }
        if let Some(padding) = cfg.flat_padding {
            base.flat_padding = padding;
        }
        if let Some(threshold) = cfg.deviation_threshold_percent {
            base.deviation_threshold_percent = threshold;
        }
        if let Some(lines) = cfg.y_grid_lines {
            base.y_grid_lines = lines;
        }
        if let Some(lines) = cfg.max_x_grid_lines {
            base.max_x_grid_lines = lines;
        }
        if let Some(radius) = cfg.hover_radius {
            base.hover_radius = radius;
        }
        if let Some(pattern) = cfg.date_format {
            base.date_format = pattern;
        }
        base
    }
}

/// Tính thống kê, biểu đồ và bảng cho một payload `/labs/timeseries`.
#[wasm_bindgen]
pub fn summarize_series(
    series_payload: JsValue,
    excluded: Option<Vec<String>>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let series_value = from_value::<serde_json::Value>(series_payload)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON chuỗi đo: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsLabsConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            LabsConfig::from(cfg)
        }
        None => LabsConfig::default(),
    };

    let report = build_report(&series_value, excluded.unwrap_or_default(), &cfg)
        .map_err(|err| JsValue::from_str(&format_labs_error(err)))?;

    to_value(&report).map_err(|err| JsValue::from_str(&format!("Không serialize báo cáo: {err}")))
}

/// Lọc danh mục `/labs/analytes` theo từ khoá; các nhóm khớp được mở sẵn.
#[wasm_bindgen]
pub fn filter_catalog(catalog_payload: JsValue, query: &str) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let catalog_value = from_value::<serde_json::Value>(catalog_payload)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON danh mục: {err}")))?;

    let view = build_catalog_view(&catalog_value, query)
        .map_err(|err| JsValue::from_str(&format_labs_error(err)))?;

    to_value(&view).map_err(|err| JsValue::from_str(&format!("Không serialize danh mục: {err}")))
}

fn build_report(
    series_value: &serde_json::Value,
    excluded: Vec<String>,
    config: &LabsConfig,
) -> Result<SeriesReport, LabsError> {
    let series = labs_wire::parse_series_value(series_value)?;
    let excluded: ExclusionSet = excluded.into_iter().map(PointId::from).collect();
    Ok(SeriesReport::build(&series, &excluded, config))
}

fn build_catalog_view(
    catalog_value: &serde_json::Value,
    query: &str,
) -> Result<CatalogView, LabsError> {
    let tree = labs_wire::parse_catalog_value(catalog_value)?;
    let mut state = CatalogState::default();
    state.set_query(&tree, query);
    Ok(state.view(&tree, None))
}

fn format_labs_error(err: LabsError) -> String {
    format!("Labs error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: JsLabsConfig = serde_json::from_value(json!({ "width": 640.0 })).unwrap();
        let cfg = LabsConfig::from(cfg);
        assert_eq!(cfg.width, 640.0);
        assert_eq!(cfg.height, LabsConfig::default().height);
        assert_eq!(cfg.date_format, "%d.%m.%Y");
    }

    #[test]
    fn scale_and_grid_fields_are_overridable() {
        let cfg: JsLabsConfig = serde_json::from_value(json!({
            "value_padding_ratio": 0.0,
            "flat_padding": 2.5,
            "y_grid_lines": 4,
            "max_x_grid_lines": 3
        }))
        .unwrap();
        let cfg = LabsConfig::from(cfg);
        assert_eq!(cfg.value_padding_ratio, 0.0);
        assert_eq!(cfg.flat_padding, 2.5);
        assert_eq!(cfg.y_grid_lines, 4);
        assert_eq!(cfg.max_x_grid_lines, 3);
        assert_eq!(cfg.width, LabsConfig::default().width);
    }

    #[test]
    fn report_applies_exclusions_by_id() {
        let payload = json!({
            "analyte": "Глюкоза",
            "standard_unit": "ммоль/л",
            "points": [
                { "date": "2024-01-10", "value_num": 5.0, "document_id": "a" },
                { "date": "2024-02-10", "value_num": 6.0, "document_id": "b" }
            ]
        });
        let report = build_report(
            &payload,
            vec!["b_2024-02-10_6_1".to_string()],
            &LabsConfig::default(),
        )
        .unwrap();
        assert_eq!(report.stats.unwrap().count, 1);
        assert_eq!(report.exclusion.excluded, 1);
    }

    #[test]
    fn catalog_errors_are_prefixed() {
        let err = build_catalog_view(&json!({}), "").unwrap_err();
        assert!(format_labs_error(err).starts_with("Labs error: "));
    }
}
