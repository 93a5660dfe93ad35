//! Thẻ tóm tắt, bảng điểm đo và báo cáo tổng hợp cho một chuỗi.
//!
//! Biểu đồ, thẻ và bảng đều lấy từ cùng một lần `compute` nên luôn khớp nhau.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::ChartModel;
use crate::format::{format_date, format_percent, format_value, format_value_with_unit};
use crate::stats::{compute, DeviationBand, SeriesStats, Trend};
use crate::{AnalyteSeries, ExclusionSet, LabsConfig, PointId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesHeader {
    pub analyte_name: String,
    pub category: Option<String>,
    pub standard_unit: Option<String>,
    pub display_unit: Option<String>,
}

impl SeriesHeader {
    pub fn from_series(series: &AnalyteSeries) -> Self {
        Self {
            analyte_name: series.analyte_name.clone(),
            category: series.category.clone(),
            standard_unit: series.standard_unit.clone(),
            display_unit: series.display_unit().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryCards {
    pub min: String,
    pub max: String,
    pub mean: String,
    pub unit: Option<String>,
    pub trend: Trend,
    /// Ví dụ `↗ 22.7%`.
    pub trend_value: String,
    pub trend_caption: String,
}

impl SummaryCards {
    pub fn from_stats(stats: &SeriesStats, unit: Option<&str>) -> Self {
        Self {
            min: format_value(stats.min),
            max: format_value(stats.max),
            mean: format_value(stats.mean),
            unit: unit.map(str::to_string),
            trend: stats.trend,
            trend_value: format!(
                "{} {}%",
                stats.trend.direction.arrow(),
                format_percent(stats.trend.percent)
            ),
            trend_caption: stats.trend.direction.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviationBadge {
    pub band: DeviationBand,
    /// Ví dụ `↑ 4.2%`.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub id: PointId,
    /// Số thứ tự đếm trên toàn bộ điểm vẽ được, giảm dần theo thời gian.
    pub ordinal: usize,
    pub date: DateTime<Utc>,
    pub date_label: String,
    pub value: f64,
    pub value_label: String,
    pub included: bool,
    /// `None` hiển thị thành "—" (điểm bị loại hoặc trung bình bằng 0).
    pub deviation: Option<DeviationBadge>,
}

/// Mọi điểm vẽ được (kể cả bị loại), mới nhất trước.
pub fn table_rows(
    series: &AnalyteSeries,
    excluded: &ExclusionSet,
    stats: Option<&SeriesStats>,
    config: &LabsConfig,
) -> Vec<TableRow> {
    let unit = series.display_unit();
    let mut rows: Vec<_> = series
        .points
        .iter()
        .filter_map(|point| point.plottable().map(|(date, value)| (point, date, value)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    let total = rows.len();
    rows.into_iter()
        .enumerate()
        .map(|(index, (point, date, value))| {
            let included = !excluded.contains(&point.id);
            let deviation = if included {
                stats
                    .and_then(|stats| stats.point(&point.id))
                    .and_then(|counted| {
                        let percent = counted.deviation.percent?;
                        let band = counted
                            .deviation
                            .band(config.deviation_threshold_percent)?;
                        let arrow = if counted.deviation.above_mean {
                            "↑"
                        } else {
                            "↓"
                        };
                        Some(DeviationBadge {
                            band,
                            label: format!("{arrow} {}%", format_percent(percent)),
                        })
                    })
            } else {
                None
            };

            TableRow {
                id: point.id.clone(),
                ordinal: total - index,
                date,
                date_label: format_date(date, &config.date_format),
                value,
                value_label: format_value_with_unit(value, unit),
                included,
                deviation,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionSummary {
    pub excluded: usize,
    pub total: usize,
}

impl ExclusionSummary {
    /// Ví dụ `Исключено: 1 из 5`; rỗng khi không loại điểm nào.
    pub fn label(&self) -> Option<String> {
        (self.excluded > 0).then(|| format!("Исключено: {} из {}", self.excluded, self.total))
    }
}

/// Toàn bộ dữ liệu suy ra của một chuỗi với một tập loại trừ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesReport {
    pub header: SeriesHeader,
    pub stats: Option<SeriesStats>,
    pub summary: Option<SummaryCards>,
    pub chart: Option<ChartModel>,
    pub table: Vec<TableRow>,
    pub exclusion: ExclusionSummary,
}

impl SeriesReport {
    pub fn build(series: &AnalyteSeries, excluded: &ExclusionSet, config: &LabsConfig) -> Self {
        let header = SeriesHeader::from_series(series);
        let stats = compute(&series.points, excluded);
        let summary = stats
            .as_ref()
            .map(|stats| SummaryCards::from_stats(stats, header.display_unit.as_deref()));
        let chart = stats
            .as_ref()
            .map(|stats| ChartModel::build(series, excluded, stats, config));
        let table = table_rows(series, excluded, stats.as_ref(), config);
        let exclusion = ExclusionSummary {
            excluded: excluded.count_within(series),
            total: series.plottable_count(),
        };

        Self {
            header,
            stats,
            summary,
            chart,
            table,
            exclusion,
        }
    }

    pub fn has_data(&self) -> bool {
        self.stats.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalytePoint;
    use chrono::TimeZone;

    fn point(id: &str, month: u32, value: Option<f64>) -> AnalytePoint {
        AnalytePoint {
            id: PointId::from(id),
            date: Some(Utc.with_ymd_and_hms(2024, month, 10, 0, 0, 0).unwrap()),
            value,
            unit: None,
            reference_range: None,
            flag: None,
            document_id: None,
        }
    }

    fn series() -> AnalyteSeries {
        AnalyteSeries {
            analyte_name: "Гемоглобин".into(),
            category: Some("Общий анализ крови".into()),
            standard_unit: Some("г/л".into()),
            points: vec![
                point("a", 1, Some(100.0)),
                point("b", 2, Some(110.0)),
                point("c", 3, Some(120.0)),
                point("broken", 4, None),
            ],
        }
    }

    #[test]
    fn table_is_reverse_chronological_with_descending_ordinals() {
        let report = SeriesReport::build(&series(), &ExclusionSet::new(), &LabsConfig::default());
        let ids: Vec<_> = report.table.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        let ordinals: Vec<_> = report.table.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![3, 2, 1]);
        assert_eq!(report.table[0].value_label, "120 г/л");
    }

    #[test]
    fn excluded_rows_keep_ordinal_and_hide_deviation() {
        let excluded: ExclusionSet = [PointId::from("c")].into_iter().collect();
        let report = SeriesReport::build(&series(), &excluded, &LabsConfig::default());
        let row_c = &report.table[0];
        assert!(!row_c.included);
        assert_eq!(row_c.ordinal, 3);
        assert!(row_c.deviation.is_none());

        let row_a = report.table[2].deviation.as_ref().unwrap();
        assert_eq!(row_a.band, DeviationBand::Normal);
        assert_eq!(row_a.label, "↓ 4.8%");
        let row_b = report.table[1].deviation.as_ref().unwrap();
        assert_eq!(row_b.label, "↑ 4.8%");
        assert_eq!(report.exclusion.label().as_deref(), Some("Исключено: 1 из 3"));
    }

    #[test]
    fn wide_spread_marks_rows_above_and_below() {
        let report = SeriesReport::build(&series(), &ExclusionSet::new(), &LabsConfig::default());
        let bands: Vec<_> = report
            .table
            .iter()
            .map(|r| r.deviation.as_ref().map(|d| d.band))
            .collect();
        assert_eq!(
            bands,
            vec![
                Some(DeviationBand::Above),
                Some(DeviationBand::Normal),
                Some(DeviationBand::Below)
            ]
        );
        assert_eq!(report.table[0].deviation.as_ref().unwrap().label, "↑ 9.1%");
    }

    #[test]
    fn summary_cards_follow_included_points() {
        let report = SeriesReport::build(&series(), &ExclusionSet::new(), &LabsConfig::default());
        let summary = report.summary.unwrap();
        assert_eq!(summary.min, "100");
        assert_eq!(summary.max, "120");
        assert_eq!(summary.mean, "110");
        assert_eq!(summary.unit.as_deref(), Some("г/л"));
        assert_eq!(summary.trend_value, "↗ 20.0%");
        assert_eq!(summary.trend_caption, "Рост");
    }

    #[test]
    fn all_excluded_keeps_table_but_drops_chart_and_cards() {
        let excluded: ExclusionSet = ["a", "b", "c"].into_iter().map(PointId::from).collect();
        let report = SeriesReport::build(&series(), &excluded, &LabsConfig::default());
        assert!(!report.has_data());
        assert!(report.chart.is_none());
        assert!(report.summary.is_none());
        assert_eq!(report.table.len(), 3);
        assert!(report.table.iter().all(|r| r.deviation.is_none()));
    }

    #[test]
    fn no_exclusions_has_no_counter_label() {
        let summary = ExclusionSummary {
            excluded: 0,
            total: 4,
        };
        assert!(summary.label().is_none());
    }
}
