use std::fs;

use labs_core::{compute, CatalogState, ExclusionSet, LabsController, TrendDirection};
use labs_wire::{parse_catalog_str, parse_series_str};
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("Không đọc được dữ liệu mẫu")
}

#[test]
fn series_payload_matches_golden() {
    let series =
        parse_series_str(&read_fixture("hemoglobin_series.json")).expect("Không chuẩn hoá được chuỗi");

    let actual = serde_json::to_value(&series).expect("Không serialize chuỗi");
    let expected: Value = serde_json::from_str(&read_fixture("hemoglobin_series_normalized.json"))
        .expect("Golden không hợp lệ");

    assert_eq!(actual, expected);
}

#[test]
fn normalized_series_feeds_statistics() {
    let series = parse_series_str(&read_fixture("hemoglobin_series.json")).unwrap();
    assert_eq!(series.plottable_count(), 4);

    let stats = compute(&series.points, &ExclusionSet::new()).unwrap();
    assert_eq!(stats.count, 4);
    assert_eq!(stats.min, 110.0);
    assert_eq!(stats.max, 135.0);
    assert_eq!(stats.mean, 123.75);
    assert_eq!(stats.trend.direction, TrendDirection::Up);
}

#[test]
fn catalog_fixture_drives_search() {
    let tree = parse_catalog_str(&read_fixture("analytes_catalog.json")).unwrap();
    assert_eq!(tree.total_analytes(), 6);
    assert_eq!(tree.first_analyte(), Some("Гемоглобин"));

    let mut state = CatalogState::default();
    state.set_query(&tree, "Гемоглобин");
    let view = state.view(&tree, None);
    let names: Vec<_> = view.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Общий анализ крови", "Биохимия крови"]);
}

#[test]
fn controller_replays_fixtures() {
    let tree = parse_catalog_str(&read_fixture("analytes_catalog.json")).unwrap();
    let mut controller = LabsController::default();
    let request = controller.load_catalog(Ok(tree)).expect("Phải tự chọn chỉ số đầu tiên");
    assert_eq!(request.analyte, "Гемоглобин");

    let series = parse_series_str(&read_fixture("hemoglobin_series.json"));
    controller.receive_series(&request, series);

    let report = controller.view().report.expect("Thiếu báo cáo");
    assert_eq!(report.table.len(), 4);
    assert_eq!(report.table[3].id.as_str(), "doc-a_2024-01-15_110_1");
    assert_eq!(report.summary.unwrap().trend_value, "↗ 22.7%");
}
