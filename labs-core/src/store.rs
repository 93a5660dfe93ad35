//! Chuỗi đo của chỉ số đang chọn cùng tập điểm bị loại.
//!
//! Mỗi lần tải mới xoá chuỗi cũ và tập loại trừ. Phản hồi đến muộn của một
//! yêu cầu đã bị thay thế bị bỏ qua để không nháy sang dữ liệu sai.

use serde::{Deserialize, Serialize};

use crate::{AnalyteSeries, ExclusionSet, LabsError, PointId};

/// Khoá của một lần tải chuỗi; `id` tăng dần trong một phiên.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub id: u64,
    pub analyte: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied,
    Empty,
    Failed,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeriesStatus {
    Idle,
    Loading { analyte: String },
    Ready { analyte: String },
    /// Tải thành công nhưng không có điểm nào vẽ được.
    Empty { analyte: String },
    Failed { analyte: String, message: String },
}

impl SeriesStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::Empty { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SeriesState {
    Idle,
    Loading,
    Loaded(AnalyteSeries),
    Failed(LabsError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesStore {
    selected: Option<String>,
    next_request_id: u64,
    latest: Option<FetchRequest>,
    state: SeriesState,
    excluded: ExclusionSet,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self {
            selected: None,
            next_request_id: 0,
            latest: None,
            state: SeriesState::Idle,
            excluded: ExclusionSet::new(),
        }
    }
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Bắt đầu tải chuỗi cho `analyte`: bỏ chuỗi và tập loại trừ hiện tại.
    pub fn begin_fetch(&mut self, analyte: &str) -> FetchRequest {
        self.next_request_id += 1;
        let request = FetchRequest {
            id: self.next_request_id,
            analyte: analyte.to_string(),
        };

        tracing::debug!(
            request_id = request.id,
            analyte,
            previous = self.selected.as_deref().unwrap_or(""),
            "series fetch started"
        );

        self.selected = Some(analyte.to_string());
        self.state = SeriesState::Loading;
        self.excluded.clear();
        self.latest = Some(request.clone());
        request
    }

    /// Tải lại chỉ số đang chọn (sau lỗi mạng chẳng hạn).
    pub fn retry(&mut self) -> Option<FetchRequest> {
        let analyte = self.selected.clone()?;
        Some(self.begin_fetch(&analyte))
    }

    /// Yêu cầu đang chờ phản hồi, nếu có.
    pub fn pending(&self) -> Option<&FetchRequest> {
        match self.state {
            SeriesState::Loading => self.latest.as_ref(),
            _ => None,
        }
    }

    /// Chỉ phản hồi của yêu cầu phát ra gần nhất mới được áp dụng; mọi phản
    /// hồi khác trả về `Stale` và không chạm vào trạng thái.
    pub fn apply(
        &mut self,
        request: &FetchRequest,
        result: Result<AnalyteSeries, LabsError>,
    ) -> FetchOutcome {
        let current = self.selected.as_deref();
        let is_latest = self.latest.as_ref().map(|latest| latest.id) == Some(request.id);

        if current != Some(request.analyte.as_str()) || !is_latest {
            tracing::debug!(
                request_id = request.id,
                analyte = %request.analyte,
                current = current.unwrap_or(""),
                "stale series response discarded"
            );
            return FetchOutcome::Stale;
        }

        self.latest = None;

        match result {
            Ok(series) => {
                let plottable = series.plottable_count();
                let outcome = if plottable == 0 {
                    tracing::info!(
                        analyte = %request.analyte,
                        points = series.points.len(),
                        "series has no plottable points"
                    );
                    FetchOutcome::Empty
                } else {
                    tracing::debug!(
                        analyte = %request.analyte,
                        points = series.points.len(),
                        plottable,
                        "series applied"
                    );
                    FetchOutcome::Applied
                };
                self.state = SeriesState::Loaded(series);
                outcome
            }
            Err(err) => {
                tracing::warn!(analyte = %request.analyte, error = %err, "series fetch failed");
                self.state = SeriesState::Failed(err);
                FetchOutcome::Failed
            }
        }
    }

    pub fn series(&self) -> Option<&AnalyteSeries> {
        match &self.state {
            SeriesState::Loaded(series) => Some(series),
            _ => None,
        }
    }

    pub fn excluded(&self) -> &ExclusionSet {
        &self.excluded
    }

    /// Đường thay đổi duy nhất của tập loại trừ. Điểm không có trong chuỗi
    /// đang hiển thị thì bỏ qua và trả về `false`.
    pub fn toggle(&mut self, id: &PointId) -> bool {
        let known = self.series().map_or(false, |series| series.contains(id));
        if !known {
            tracing::debug!(point = %id, "toggle ignored for unknown point");
            return false;
        }
        self.excluded.toggle(id);
        true
    }

    pub fn status(&self) -> SeriesStatus {
        let analyte = self.selected.clone().unwrap_or_default();
        match &self.state {
            SeriesState::Idle => SeriesStatus::Idle,
            SeriesState::Loading => SeriesStatus::Loading { analyte },
            SeriesState::Loaded(series) if series.plottable_count() == 0 => {
                SeriesStatus::Empty { analyte }
            }
            SeriesState::Loaded(_) => SeriesStatus::Ready { analyte },
            SeriesState::Failed(err) => SeriesStatus::Failed {
                analyte,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalytePoint;
    use chrono::{TimeZone, Utc};

    fn series(name: &str, values: &[f64]) -> AnalyteSeries {
        AnalyteSeries {
            analyte_name: name.to_string(),
            category: None,
            standard_unit: None,
            points: values
                .iter()
                .enumerate()
                .map(|(index, value)| AnalytePoint {
                    id: PointId::new(format!("{name}-{index}")),
                    date: Some(Utc.with_ymd_and_hms(2024, 1, index as u32 + 1, 0, 0, 0).unwrap()),
                    value: Some(*value),
                    unit: None,
                    reference_range: None,
                    flag: None,
                    document_id: None,
                })
                .collect(),
        }
    }

    #[test]
    fn late_response_for_previous_analyte_is_dropped() {
        let mut store = TimeSeriesStore::new();
        let request_a = store.begin_fetch("A");
        let request_b = store.begin_fetch("B");

        assert_eq!(
            store.apply(&request_b, Ok(series("B", &[1.0, 2.0]))),
            FetchOutcome::Applied
        );
        assert_eq!(
            store.apply(&request_a, Ok(series("A", &[9.0]))),
            FetchOutcome::Stale
        );
        assert_eq!(store.series().unwrap().analyte_name, "B");
    }

    #[test]
    fn stale_response_while_loading_keeps_loading_state() {
        let mut store = TimeSeriesStore::new();
        let request_a = store.begin_fetch("A");
        store.begin_fetch("B");
        assert_eq!(
            store.apply(&request_a, Ok(series("A", &[1.0]))),
            FetchOutcome::Stale
        );
        assert!(store.status().is_loading());
        assert!(store.series().is_none());
    }

    #[test]
    fn older_response_for_same_analyte_does_not_overwrite_newer() {
        let mut store = TimeSeriesStore::new();
        let first = store.begin_fetch("A");
        let second = store.begin_fetch("A");
        assert_eq!(
            store.apply(&second, Ok(series("A", &[2.0]))),
            FetchOutcome::Applied
        );
        assert_eq!(
            store.apply(&first, Ok(series("A", &[1.0, 1.5]))),
            FetchOutcome::Stale
        );
        assert_eq!(store.series().unwrap().points.len(), 1);
    }

    #[test]
    fn reselected_analyte_ignores_response_of_earlier_request() {
        let mut store = TimeSeriesStore::new();
        let first_a = store.begin_fetch("A");
        store.begin_fetch("B");
        let second_a = store.begin_fetch("A");

        assert_eq!(
            store.apply(&first_a, Ok(series("A", &[1.0, 2.0]))),
            FetchOutcome::Stale
        );
        assert_eq!(store.pending(), Some(&second_a));
        assert!(store.series().is_none());
        assert!(!store.toggle(&PointId::from("A-0")));

        assert_eq!(
            store.apply(&second_a, Ok(series("A", &[3.0, 4.0]))),
            FetchOutcome::Applied
        );
        assert!(store.excluded().is_empty());
        assert_eq!(store.series().unwrap().points[0].value, Some(3.0));
    }

    #[test]
    fn response_is_applied_only_once() {
        let mut store = TimeSeriesStore::new();
        let request = store.begin_fetch("A");
        store.apply(&request, Ok(series("A", &[1.0, 2.0])));
        assert!(store.toggle(&PointId::from("A-1")));

        assert_eq!(
            store.apply(&request, Ok(series("A", &[1.0, 2.0]))),
            FetchOutcome::Stale
        );
        assert_eq!(store.excluded().len(), 1);
    }

    #[test]
    fn failure_and_empty_are_distinct_states() {
        let mut store = TimeSeriesStore::new();
        let request = store.begin_fetch("A");
        let outcome = store.apply(&request, Err(LabsError::FetchFailure("502".into())));
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(matches!(store.status(), SeriesStatus::Failed { .. }));

        let request = store.retry().unwrap();
        assert_eq!(request.analyte, "A");
        let outcome = store.apply(&request, Ok(series("A", &[])));
        assert_eq!(outcome, FetchOutcome::Empty);
        assert_eq!(
            store.status(),
            SeriesStatus::Empty {
                analyte: "A".into()
            }
        );
    }

    #[test]
    fn new_fetch_clears_exclusions() {
        let mut store = TimeSeriesStore::new();
        let request = store.begin_fetch("A");
        store.apply(&request, Ok(series("A", &[1.0, 2.0])));
        assert!(store.toggle(&PointId::from("A-0")));
        assert_eq!(store.excluded().len(), 1);

        store.begin_fetch("B");
        assert!(store.excluded().is_empty());
    }

    #[test]
    fn toggle_of_unknown_point_is_noop() {
        let mut store = TimeSeriesStore::new();
        assert!(!store.toggle(&PointId::from("A-0")));

        let request = store.begin_fetch("A");
        store.apply(&request, Ok(series("A", &[1.0])));
        assert!(!store.toggle(&PointId::from("ghost")));
        assert!(store.excluded().is_empty());
    }

    #[test]
    fn pending_tracks_latest_request() {
        let mut store = TimeSeriesStore::new();
        assert!(store.pending().is_none());
        let request = store.begin_fetch("A");
        assert_eq!(store.pending(), Some(&request));
        store.apply(&request, Ok(series("A", &[1.0])));
        assert!(store.pending().is_none());
    }
}
