//! Mô hình biểu đồ đường: polyline, đường trung bình, lưới, điểm đánh dấu và tooltip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::{format_date, format_value, format_value_with_unit};
use crate::scale::{CoordinateMapper, PlotArea, Viewport};
use crate::stats::SeriesStats;
use crate::{AnalyteSeries, ExclusionSet, LabsConfig, PointId};

const VALUE_AXIS_FALLBACK: &str = "Значение";
const DATE_AXIS_LABEL: &str = "Дата анализа";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlotCoord {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    Included,
    /// Vẫn vẽ (mờ) để người dùng có thể đưa điểm trở lại.
    Excluded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub id: PointId,
    pub date: DateTime<Utc>,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub state: MarkerState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisTick {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tooltip {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub date_label: String,
    pub value_label: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartModel {
    pub viewport: Viewport,
    pub plot: PlotArea,
    pub value_domain: (f64, f64),
    /// Chỉ nối các điểm đang được tính, theo thời gian tăng dần.
    pub line: Vec<PlotCoord>,
    pub mean_y: f64,
    pub mean_label: String,
    pub markers: Vec<Marker>,
    pub x_ticks: Vec<AxisTick>,
    pub y_ticks: Vec<AxisTick>,
    pub value_axis_label: String,
    pub date_axis_label: String,
    unit: Option<String>,
    date_format: String,
}

impl ChartModel {
    pub fn build(
        series: &AnalyteSeries,
        excluded: &ExclusionSet,
        stats: &SeriesStats,
        config: &LabsConfig,
    ) -> Self {
        let viewport = config.viewport();
        let mapper = CoordinateMapper::fit(stats, &viewport, config);
        let plot = mapper.area;
        let unit = series.display_unit().map(str::to_string);

        let line = stats
            .points
            .iter()
            .map(|point| {
                let (x, y) = mapper.project(point.date, point.value);
                PlotCoord { x, y }
            })
            .collect();

        let mut plottable: Vec<_> = series
            .points
            .iter()
            .filter_map(|point| point.plottable().map(|(date, value)| (point, date, value)))
            .collect();
        plottable.sort_by_key(|(_, date, _)| *date);

        let markers = plottable
            .into_iter()
            .map(|(point, date, value)| {
                let (raw_x, raw_y) = mapper.project(date, value);
                let (x, y) = plot.clamp(raw_x, raw_y);
                let state = if excluded.contains(&point.id) {
                    MarkerState::Excluded
                } else {
                    MarkerState::Included
                };
                Marker {
                    id: point.id.clone(),
                    date,
                    value,
                    x,
                    y,
                    state,
                }
            })
            .collect();

        let y_ticks = mapper
            .value
            .ticks(config.y_grid_lines)
            .into_iter()
            .map(|value| AxisTick {
                position: mapper.value.y(value),
                label: format_value(value),
            })
            .collect();

        let x_tick_count = stats.count.min(config.max_x_grid_lines);
        let x_ticks = mapper
            .time
            .ticks(x_tick_count)
            .into_iter()
            .map(|date| AxisTick {
                position: mapper.time.x(date),
                label: format_date(date, &config.date_format),
            })
            .collect();

        Self {
            viewport,
            plot,
            value_domain: (mapper.value.min, mapper.value.max),
            line,
            mean_y: mapper.value.y(stats.mean),
            mean_label: format!(
                "Среднее: {}",
                format_value_with_unit(stats.mean, unit.as_deref())
            ),
            markers,
            x_ticks,
            y_ticks,
            value_axis_label: unit
                .clone()
                .unwrap_or_else(|| VALUE_AXIS_FALLBACK.to_string()),
            date_axis_label: DATE_AXIS_LABEL.to_string(),
            unit,
            date_format: config.date_format.clone(),
        }
    }

    /// Dữ liệu `d` của SVG path cho đường chính.
    pub fn line_path(&self) -> String {
        self.line
            .iter()
            .enumerate()
            .map(|(index, coord)| {
                let command = if index == 0 { 'M' } else { 'L' };
                format!("{command} {:.2} {:.2}", coord.x, coord.y)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Vùng tô dưới đường, khép về đáy vùng vẽ.
    pub fn area_path(&self) -> String {
        let (Some(first), Some(last)) = (self.line.first(), self.line.last()) else {
            return String::new();
        };
        let bottom = self.plot.bottom();
        format!(
            "{} L {:.2} {bottom:.2} L {:.2} {bottom:.2} Z",
            self.line_path(),
            last.x,
            first.x
        )
    }

    pub fn marker(&self, id: &PointId) -> Option<&Marker> {
        self.markers.iter().find(|marker| &marker.id == id)
    }

    /// Điểm đánh dấu gần con trỏ nhất trong bán kính `radius`.
    /// Khi khoảng cách bằng nhau, điểm sớm hơn được chọn.
    pub fn nearest_marker(&self, x: f64, y: f64, radius: f64) -> Option<&Marker> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let mut best: Option<(&Marker, f64)> = None;
        for marker in &self.markers {
            let dx = marker.x - x;
            let dy = marker.y - y;
            let distance = dx * dx + dy * dy;
            if best.map_or(true, |(_, current)| distance < current) {
                best = Some((marker, distance));
            }
        }

        best.filter(|(_, distance)| distance.sqrt() <= radius)
            .map(|(marker, _)| marker)
    }

    pub fn tooltip(&self, id: &PointId) -> Option<Tooltip> {
        let marker = self.marker(id)?;
        Some(Tooltip {
            id: marker.id.clone(),
            x: marker.x,
            y: marker.y,
            date_label: format_date(marker.date, &self.date_format),
            value_label: format_value_with_unit(marker.value, self.unit.as_deref()),
            unit: self.unit.clone(),
        })
    }
}
