//! Ánh xạ miền (ngày, giá trị) sang toạ độ pixel của vùng vẽ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::SeriesStats;
use crate::{Insets, LabsConfig};

/// Kích thước toàn bộ biểu đồ cùng khoảng chừa cho trục.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub insets: Insets,
}

impl Viewport {
    /// Vùng vẽ bên trong; kích thước âm được kẹp về 0.
    pub fn plot_area(&self) -> PlotArea {
        PlotArea {
            left: self.insets.left,
            top: self.insets.top,
            width: (self.width - self.insets.left - self.insets.right).max(0.0),
            height: (self.height - self.insets.top - self.insets.bottom).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(self.left, self.right()),
            y.clamp(self.top, self.bottom()),
        )
    }
}

/// Thang thời gian tuyến tính theo mili-giây.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeScale {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
    area: PlotArea,
}

impl TimeScale {
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>, area: PlotArea) -> Self {
        Self { min, max, area }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Khi miền suy biến (một ngày duy nhất) mọi điểm nằm giữa vùng vẽ.
    pub fn x(&self, date: DateTime<Utc>) -> f64 {
        if self.is_degenerate() {
            return self.area.center_x();
        }
        let span = (self.max.timestamp_millis() - self.min.timestamp_millis()) as f64;
        let offset = (date.timestamp_millis() - self.min.timestamp_millis()) as f64;
        self.area.left + offset / span * self.area.width
    }

    /// Các mốc chia đều trên miền thời gian.
    pub fn ticks(&self, count: usize) -> Vec<DateTime<Utc>> {
        if count == 0 {
            return Vec::new();
        }
        if count == 1 || self.is_degenerate() {
            return vec![self.min];
        }

        let start = i128::from(self.min.timestamp_millis());
        let span = i128::from(self.max.timestamp_millis()) - start;
        let steps = (count - 1) as i128;
        (0..count)
            .filter_map(|index| {
                let millis = start + span * index as i128 / steps;
                i64::try_from(millis)
                    .ok()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
            })
            .collect()
    }
}

/// Thang giá trị tuyến tính, trục y hướng xuống như SVG.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
    pub padding: f64,
    area: PlotArea,
}

impl ValueScale {
    /// Miền `[min - pad, max + pad]`; chuỗi phẳng dùng `flat_padding`
    /// để thang không bao giờ có chiều cao bằng 0.
    ///
    /// Giá trị gần giới hạn `f64` không làm tràn số: miền bị kẹp về
    /// `f64::MIN..=f64::MAX`.
    pub fn fit(min: f64, max: f64, ratio: f64, flat_padding: f64, area: PlotArea) -> Self {
        let spread = (max / 2.0 - min / 2.0) * ratio * 2.0;
        let padding = if spread == 0.0 {
            flat_padding
        } else if spread.is_finite() {
            spread
        } else {
            f64::MAX
        };
        Self {
            min: (min - padding).max(f64::MIN),
            max: (max + padding).min(f64::MAX),
            padding,
            area,
        }
    }

    /// Vị trí tương đối của `value` trong miền, tính theo nửa giá trị để
    /// hiệu `max - min` không tràn.
    fn fraction(&self, value: f64) -> f64 {
        (value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn y(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return self.area.center_y();
        }
        self.area.bottom() - self.fraction(value) * self.area.height
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![self.min],
            _ => {
                let steps = (count - 1) as f64;
                (0..count)
                    .map(|index| {
                        let t = index as f64 / steps;
                        self.min * (1.0 - t) + self.max * t
                    })
                    .collect()
            }
        }
    }
}

/// Cặp thang độc lập cho trục x (ngày) và trục y (giá trị).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoordinateMapper {
    pub area: PlotArea,
    pub time: TimeScale,
    pub value: ValueScale,
}

impl CoordinateMapper {
    /// Dựng thang từ các điểm đang được tính; `stats` luôn có ít nhất một điểm.
    pub fn fit(stats: &SeriesStats, viewport: &Viewport, config: &LabsConfig) -> Self {
        let area = viewport.plot_area();
        let first = stats.first_date().unwrap_or_default();
        let last = stats.last_date().unwrap_or(first);

        Self {
            area,
            time: TimeScale::new(first, last, area),
            value: ValueScale::fit(
                stats.min,
                stats.max,
                config.value_padding_ratio,
                config.flat_padding,
                area,
            ),
        }
    }

    pub fn project(&self, date: DateTime<Utc>, value: f64) -> (f64, f64) {
        (self.time.x(date), self.value.y(value))
    }
}
