//! Logic lõi phân tích chuỗi xét nghiệm theo thời gian và dựng biểu đồ tương tác.

pub mod catalog;
pub mod chart;
pub mod controller;
pub mod format;
pub mod report;
pub mod scale;
pub mod stats;
pub mod store;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use catalog::{CatalogState, CatalogView};
pub use chart::{ChartModel, Marker, MarkerState, Tooltip};
pub use controller::{CatalogStatus, LabsController, LabsView};
pub use report::{SeriesReport, SummaryCards, TableRow};
pub use scale::{CoordinateMapper, PlotArea, Viewport};
pub use stats::{compute, DeviationBand, SeriesStats, Trend, TrendDirection};
pub use store::{FetchOutcome, FetchRequest, SeriesStatus, TimeSeriesStore};

/// Khoảng chừa quanh vùng vẽ để đặt nhãn trục và chú thích.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Insets {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 40.0,
            bottom: 70.0,
            left: 80.0,
        }
    }
}

/// Cấu hình kích thước biểu đồ và các ngưỡng phân tích.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabsConfig {
    pub width: f64,
    pub height: f64,
    pub insets: Insets,
    /// Tỉ lệ đệm thêm vào hai đầu miền giá trị.
    pub value_padding_ratio: f64,
    /// Đệm cố định khi mọi giá trị bằng nhau.
    pub flat_padding: f64,
    /// Ngưỡng (%) để coi độ lệch so với trung bình là đáng kể.
    pub deviation_threshold_percent: f64,
    pub y_grid_lines: usize,
    pub max_x_grid_lines: usize,
    /// Bán kính (pixel) để bắt điểm gần con trỏ nhất.
    pub hover_radius: f64,
    /// Mẫu định dạng ngày theo cú pháp `chrono::format`.
    pub date_format: String,
}

impl Default for LabsConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 400.0,
            insets: Insets::default(),
            value_padding_ratio: 0.15,
            flat_padding: 1.0,
            deviation_threshold_percent: 5.0,
            y_grid_lines: 6,
            max_x_grid_lines: 8,
            hover_radius: 24.0,
            date_format: "%d.%m.%Y".to_string(),
        }
    }
}

impl LabsConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
            insets: self.insets,
        }
    }
}

/// Định danh một điểm đo trong chuỗi hiện tại.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PointId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Cờ định tính đi kèm kết quả xét nghiệm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LabFlag {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "A")]
    Abnormal,
    #[serde(rename = "N")]
    Normal,
}

impl LabFlag {
    /// Đọc mã một ký tự (`H`, `L`, `A`, `N`), không phân biệt hoa thường.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "H" => Some(Self::High),
            "L" => Some(Self::Low),
            "A" => Some(Self::Abnormal),
            "N" => Some(Self::Normal),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::High => "H",
            Self::Low => "L",
            Self::Abnormal => "A",
            Self::Normal => "N",
        }
    }
}

/// Một lần đo của chỉ số xét nghiệm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalytePoint {
    pub id: PointId,
    pub date: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub flag: Option<LabFlag>,
    pub document_id: Option<String>,
}

impl AnalytePoint {
    /// Ngày và giá trị khi điểm đủ điều kiện đưa lên biểu đồ.
    pub fn plottable(&self) -> Option<(DateTime<Utc>, f64)> {
        let date = self.date?;
        let value = self.value.filter(|value| value.is_finite())?;
        Some((date, value))
    }

    pub fn is_plottable(&self) -> bool {
        self.plottable().is_some()
    }
}

/// Chuỗi đo của một chỉ số, trả về từ một lần tải.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyteSeries {
    pub analyte_name: String,
    pub category: Option<String>,
    pub standard_unit: Option<String>,
    pub points: Vec<AnalytePoint>,
}

impl AnalyteSeries {
    pub fn point(&self, id: &PointId) -> Option<&AnalytePoint> {
        self.points.iter().find(|point| &point.id == id)
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.point(id).is_some()
    }

    pub fn plottable_count(&self) -> usize {
        self.points.iter().filter(|point| point.is_plottable()).count()
    }

    /// Đơn vị hiển thị: đơn vị chuẩn, nếu thiếu thì lấy của lần đo sớm nhất.
    pub fn display_unit(&self) -> Option<&str> {
        if let Some(unit) = self.standard_unit.as_deref() {
            return Some(unit);
        }

        self.points
            .iter()
            .filter_map(|point| point.plottable().map(|(date, _)| (date, point)))
            .min_by_key(|(date, _)| *date)
            .and_then(|(_, point)| point.unit.as_deref())
    }
}

/// Tập điểm người dùng tạm loại khỏi thống kê và biểu đồ.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<PointId>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Đảo trạng thái của điểm, trả về `true` nếu điểm đang bị loại sau khi đảo.
    pub fn toggle(&mut self, id: &PointId) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.clone());
            true
        }
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointId> {
        self.0.iter()
    }

    /// Số điểm bị loại thực sự có mặt (và vẽ được) trong chuỗi.
    pub fn count_within(&self, series: &AnalyteSeries) -> usize {
        series
            .points
            .iter()
            .filter(|point| point.is_plottable() && self.0.contains(&point.id))
            .count()
    }
}

impl FromIterator<PointId> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = PointId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Danh mục xét nghiệm theo nhóm, tải một lần cho cả phiên.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryTree {
    pub categories: Vec<LabCategory>,
}

impl CategoryTree {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_analytes(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.analytes.len())
            .sum()
    }

    /// Chỉ số đầu tiên của nhóm đầu tiên (dùng để tự chọn khi mở trang).
    pub fn first_analyte(&self) -> Option<&str> {
        self.categories
            .first()
            .and_then(|category| category.analytes.first())
            .map(|analyte| analyte.canonical_name.as_str())
    }

    /// Nhóm đầu tiên chứa chỉ số có tên chuẩn trùng khớp.
    pub fn category_of(&self, canonical_name: &str) -> Option<&LabCategory> {
        self.categories.iter().find(|category| {
            category
                .analytes
                .iter()
                .any(|analyte| analyte.canonical_name == canonical_name)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabCategory {
    pub name: String,
    pub analytes: Vec<AnalyteSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyteSummary {
    pub canonical_name: String,
    pub standard_unit: Option<String>,
    pub measurement_count: u32,
}

/// Lỗi chung khi tải và chuẩn hoá dữ liệu xét nghiệm.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LabsError {
    #[error("Không tải được dữ liệu: {0}")]
    FetchFailure(String),
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Lỗi khác: {0}")]
    Other(String),
}
