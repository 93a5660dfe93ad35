//! Thống kê trên các điểm đang được tính (có ngày, có giá trị, không bị loại).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AnalytePoint, ExclusionSet, PointId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Up => "↗",
            Self::Down => "↘",
            Self::Stable => "→",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "Рост",
            Self::Down => "Снижение",
            Self::Stable => "Стабильно",
        }
    }
}

/// Xu hướng giữa lần đo đầu và cuối theo thời gian.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Độ lớn thay đổi (%), luôn không âm; chiều nằm ở `direction`.
    pub percent: f64,
}

impl Trend {
    pub fn between(first: f64, last: f64) -> Self {
        let direction = if last > first {
            TrendDirection::Up
        } else if last < first {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        let percent = if first == 0.0 {
            0.0
        } else {
            ((last - first) / first.abs() * 100.0).abs()
        };

        Self { direction, percent }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviationBand {
    Normal,
    Above,
    Below,
}

/// Độ lệch của một điểm so với trung bình.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Deviation {
    /// `None` khi trung bình bằng 0.
    pub percent: Option<f64>,
    pub above_mean: bool,
}

impl Deviation {
    pub fn from_mean(value: f64, mean: f64) -> Self {
        let percent = if mean == 0.0 {
            None
        } else {
            Some((value - mean) / mean * 100.0)
        };

        Self {
            percent,
            above_mean: value > mean,
        }
    }

    pub fn band(&self, threshold_percent: f64) -> Option<DeviationBand> {
        let percent = self.percent?;
        let band = if percent.abs() < threshold_percent {
            DeviationBand::Normal
        } else if self.above_mean {
            DeviationBand::Above
        } else {
            DeviationBand::Below
        };
        Some(band)
    }
}

/// Điểm được đưa vào thống kê, đã sắp xếp theo thời gian tăng dần.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncludedPoint {
    pub id: PointId,
    pub date: DateTime<Utc>,
    pub value: f64,
    pub deviation: Deviation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub first: f64,
    pub last: f64,
    pub trend: Trend,
    pub points: Vec<IncludedPoint>,
}

impl SeriesStats {
    pub fn point(&self, id: &PointId) -> Option<&IncludedPoint> {
        self.points.iter().find(|point| &point.id == id)
    }

    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|point| point.date)
    }

    pub fn last_date(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|point| point.date)
    }

    pub fn is_flat(&self) -> bool {
        self.max == self.min
    }
}

/// Tính thống kê từ các điểm vẽ được và không nằm trong `excluded`.
///
/// Trả về `None` khi không còn điểm nào. Hàm thuần: cùng đầu vào luôn cho
/// cùng kết quả. Các điểm trùng ngày giữ nguyên thứ tự xuất hiện.
pub fn compute(points: &[AnalytePoint], excluded: &ExclusionSet) -> Option<SeriesStats> {
    let mut included: Vec<(&PointId, DateTime<Utc>, f64)> = points
        .iter()
        .filter(|point| !excluded.contains(&point.id))
        .filter_map(|point| {
            point
                .plottable()
                .map(|(date, value)| (&point.id, date, value))
        })
        .collect();

    if included.is_empty() {
        return None;
    }

    included.sort_by_key(|(_, date, _)| *date);

    let count = included.len();
    let min = included
        .iter()
        .map(|(_, _, value)| *value)
        .fold(f64::INFINITY, f64::min);
    let max = included
        .iter()
        .map(|(_, _, value)| *value)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = included.iter().map(|(_, _, value)| *value).sum::<f64>() / count as f64;

    let first = included[0].2;
    let last = included[count - 1].2;

    let points = included
        .into_iter()
        .map(|(id, date, value)| IncludedPoint {
            id: id.clone(),
            date,
            value,
            deviation: Deviation::from_mean(value, mean),
        })
        .collect();

    Some(SeriesStats {
        count,
        min,
        max,
        mean,
        first,
        last,
        trend: Trend::between(first, last),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(id: &str, month: u32, value: f64) -> AnalytePoint {
        AnalytePoint {
            id: PointId::from(id),
            date: Some(Utc.with_ymd_and_hms(2024, month, 1, 9, 0, 0).unwrap()),
            value: Some(value),
            unit: Some("г/л".to_string()),
            reference_range: None,
            flag: None,
            document_id: None,
        }
    }

    fn excluded(ids: &[&str]) -> ExclusionSet {
        ids.iter().map(|id| PointId::from(*id)).collect()
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(compute(&[], &ExclusionSet::new()).is_none());
    }

    #[test]
    fn all_points_excluded_yields_none() {
        let points = vec![point("a", 1, 100.0), point("b", 2, 110.0)];
        assert!(compute(&points, &excluded(&["a", "b"])).is_none());
    }

    #[test]
    fn excluding_a_point_shrinks_the_domain() {
        let points = vec![
            point("a", 1, 100.0),
            point("b", 2, 110.0),
            point("c", 3, 120.0),
        ];
        let stats = compute(&points, &excluded(&["c"])).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 110.0);
        assert_eq!(stats.mean, 105.0);
    }

    #[test]
    fn trend_follows_chronology_not_insertion_order() {
        let points = vec![
            point("jun", 6, 135.0),
            point("jan", 1, 110.0),
            point("feb", 2, 115.0),
        ];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.first, 110.0);
        assert_eq!(stats.last, 135.0);
        assert_eq!(stats.trend.direction, TrendDirection::Up);
        assert!((stats.trend.percent - 22.727_272).abs() < 1e-4);
    }

    #[test]
    fn falling_trend_reports_unsigned_percent() {
        let points = vec![point("a", 1, 200.0), point("b", 2, 150.0)];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.trend.direction, TrendDirection::Down);
        assert!((stats.trend.percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_first_value_gives_zero_percent() {
        let trend = Trend::between(0.0, 4.0);
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.percent, 0.0);
    }

    #[test]
    fn negative_first_value_uses_absolute_base() {
        let trend = Trend::between(-2.0, 1.0);
        assert_eq!(trend.direction, TrendDirection::Up);
        assert!((trend.percent - 150.0).abs() < 1e-9);
    }

    #[test]
    fn single_point_is_stable_with_zero_deviation() {
        let points = vec![point("only", 4, 7.3)];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.trend.direction, TrendDirection::Stable);
        assert_eq!(stats.trend.percent, 0.0);
        assert_eq!(stats.points[0].deviation.percent, Some(0.0));
        assert_eq!(
            stats.points[0].deviation.band(5.0),
            Some(DeviationBand::Normal)
        );
    }

    #[test]
    fn zero_mean_leaves_deviation_undefined() {
        let points = vec![point("a", 1, -1.0), point("b", 2, 1.0)];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.mean, 0.0);
        assert!(stats.points.iter().all(|p| p.deviation.percent.is_none()));
        assert!(stats.points.iter().all(|p| p.deviation.band(5.0).is_none()));
    }

    #[test]
    fn deviation_bands_split_at_threshold() {
        let points = vec![
            point("low", 1, 80.0),
            point("mid", 2, 100.0),
            point("high", 3, 120.0),
            point("near", 4, 102.0),
        ];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        let band = |id: &str| {
            stats
                .point(&PointId::from(id))
                .and_then(|p| p.deviation.band(5.0))
        };
        assert_eq!(band("low"), Some(DeviationBand::Below));
        assert_eq!(band("high"), Some(DeviationBand::Above));
        assert_eq!(band("mid"), Some(DeviationBand::Normal));
        assert_eq!(band("near"), Some(DeviationBand::Normal));
    }

    #[test]
    fn deviation_exactly_at_threshold_is_significant() {
        let points = vec![point("low", 1, 95.0), point("high", 2, 105.0)];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.mean, 100.0);

        let band = |id: &str| {
            let deviation = stats.point(&PointId::from(id)).unwrap().deviation;
            assert_eq!(deviation.percent.map(f64::abs), Some(5.0));
            deviation.band(5.0)
        };
        assert_eq!(band("high"), Some(DeviationBand::Above));
        assert_eq!(band("low"), Some(DeviationBand::Below));
    }

    #[test]
    fn unplottable_points_are_skipped() {
        let mut undated = point("undated", 1, 500.0);
        undated.date = None;
        let mut missing = point("missing", 2, 0.0);
        missing.value = None;
        let points = vec![undated, missing, point("ok", 3, 42.0)];
        let stats = compute(&points, &ExclusionSet::new()).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.max, 42.0);
    }

    #[test]
    fn unknown_excluded_ids_are_ignored() {
        let points = vec![point("a", 1, 10.0), point("b", 2, 20.0)];
        let with_ghost = compute(&points, &excluded(&["ghost"]));
        let without = compute(&points, &ExclusionSet::new());
        assert_eq!(with_ghost, without);
    }

    #[test]
    fn compute_is_deterministic() {
        let points = vec![
            point("a", 3, 4.1),
            point("b", 1, 3.9),
            point("c", 3, 4.4),
        ];
        let set = excluded(&["b"]);
        assert_eq!(compute(&points, &set), compute(&points, &set));
    }
}
