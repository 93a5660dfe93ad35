//! Bộ điều phối sự kiện giao diện: chọn chỉ số, nhận phản hồi, bật/tắt điểm, hover.
//!
//! Trạng thái nằm trong một đối tượng tường minh; mọi giá trị hiển thị được
//! tính lại đồng bộ bằng các hàm thuần trong `view()`.

use serde::{Deserialize, Serialize};

use crate::catalog::{normalize_query, CatalogState, CatalogView};
use crate::chart::{ChartModel, Tooltip};
use crate::report::SeriesReport;
use crate::stats::compute;
use crate::store::{FetchOutcome, FetchRequest, SeriesStatus, TimeSeriesStore};
use crate::{AnalyteSeries, CategoryTree, LabsConfig, LabsError, PointId};

const NO_DATA_PLACEHOLDER: &str = "Нет данных для отображения";
const SELECT_PLACEHOLDER: &str = "Выберите анализ для просмотра";
const NO_ANALYTES_PLACEHOLDER: &str = "Нет доступных анализов";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CatalogStatus {
    Loading,
    Ready,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
enum CatalogSlot {
    Loading,
    Ready(CategoryTree),
    Failed(LabsError),
}

/// Ảnh chụp toàn bộ dữ liệu cần vẽ màn hình xét nghiệm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabsView {
    pub catalog_status: CatalogStatus,
    pub catalog: Option<CatalogView>,
    pub selected: Option<String>,
    pub series_status: SeriesStatus,
    pub report: Option<SeriesReport>,
    pub hovered: Option<Tooltip>,
    /// Thông báo thay cho biểu đồ khi không có gì để vẽ.
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabsController {
    config: LabsConfig,
    catalog: CatalogSlot,
    catalog_state: CatalogState,
    store: TimeSeriesStore,
    hovered: Option<PointId>,
}

impl Default for LabsController {
    fn default() -> Self {
        Self::new(LabsConfig::default())
    }
}

impl LabsController {
    pub fn new(config: LabsConfig) -> Self {
        Self {
            config,
            catalog: CatalogSlot::Loading,
            catalog_state: CatalogState::default(),
            store: TimeSeriesStore::new(),
            hovered: None,
        }
    }

    pub fn config(&self) -> &LabsConfig {
        &self.config
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn selected(&self) -> Option<&str> {
        self.store.selected()
    }

    pub fn pending_request(&self) -> Option<&FetchRequest> {
        self.store.pending()
    }

    /// Nhận kết quả tải danh mục. Nếu chưa chọn chỉ số nào thì tự chọn chỉ số
    /// đầu tiên và trả về yêu cầu tải chuỗi tương ứng.
    pub fn load_catalog(
        &mut self,
        result: Result<CategoryTree, LabsError>,
    ) -> Option<FetchRequest> {
        match result {
            Ok(tree) => {
                tracing::info!(
                    categories = tree.categories.len(),
                    analytes = tree.total_analytes(),
                    "analyte catalog loaded"
                );
                let first = tree.first_analyte().map(str::to_string);
                self.catalog = CatalogSlot::Ready(tree);
                let query = self.catalog_state.query().to_string();
                if !normalize_query(&query).is_empty() {
                    self.set_search(&query);
                }

                match (self.store.selected(), first) {
                    (None, Some(first)) => self.select_analyte(&first),
                    _ => None,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "analyte catalog fetch failed");
                self.catalog = CatalogSlot::Failed(err);
                None
            }
        }
    }

    /// Đánh dấu danh mục đang tải lại (sau lỗi).
    pub fn reload_catalog(&mut self) {
        self.catalog = CatalogSlot::Loading;
    }

    pub fn catalog_status(&self) -> CatalogStatus {
        match &self.catalog {
            CatalogSlot::Loading => CatalogStatus::Loading,
            CatalogSlot::Ready(_) => CatalogStatus::Ready,
            CatalogSlot::Failed(err) => CatalogStatus::Failed {
                message: err.to_string(),
            },
        }
    }

    pub fn catalog(&self) -> Option<&CategoryTree> {
        match &self.catalog {
            CatalogSlot::Ready(tree) => Some(tree),
            _ => None,
        }
    }

    /// Chọn một chỉ số (chỉ một chỉ số tại một thời điểm). Chọn lại chỉ số
    /// đang chọn không làm gì.
    pub fn select_analyte(&mut self, canonical_name: &str) -> Option<FetchRequest> {
        if self.store.selected() == Some(canonical_name) {
            return None;
        }

        self.hovered = None;
        if let CatalogSlot::Ready(tree) = &self.catalog {
            self.catalog_state.expand_for_analyte(tree, canonical_name);
        }
        Some(self.store.begin_fetch(canonical_name))
    }

    pub fn receive_series(
        &mut self,
        request: &FetchRequest,
        result: Result<AnalyteSeries, LabsError>,
    ) -> FetchOutcome {
        let outcome = self.store.apply(request, result);
        if outcome != FetchOutcome::Stale {
            self.hovered = None;
        }
        outcome
    }

    pub fn retry(&mut self) -> Option<FetchRequest> {
        self.hovered = None;
        self.store.retry()
    }

    /// Đảo trạng thái tính/loại của một điểm; điểm lạ bị bỏ qua.
    pub fn toggle_point(&mut self, id: &PointId) -> bool {
        self.store.toggle(id)
    }

    pub fn set_search(&mut self, query: &str) {
        match &self.catalog {
            CatalogSlot::Ready(tree) => self.catalog_state.set_query(tree, query),
            _ => self.catalog_state.set_query(&CategoryTree::default(), query),
        }
    }

    pub fn toggle_category(&mut self, category: &str) {
        self.catalog_state.toggle_category(category);
    }

    /// Cập nhật điểm đang hover theo toạ độ con trỏ trong hệ toạ độ biểu đồ.
    pub fn hover_at(&mut self, x: f64, y: f64) -> Option<&PointId> {
        let excluded = self.store.excluded();
        let hit = self.store.series().and_then(|series| {
            let stats = compute(&series.points, excluded)?;
            let chart = ChartModel::build(series, excluded, &stats, &self.config);
            chart
                .nearest_marker(x, y, self.config.hover_radius)
                .map(|marker| marker.id.clone())
        });
        self.hovered = hit;
        self.hovered.as_ref()
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn view(&self) -> LabsView {
        let catalog = self
            .catalog()
            .map(|tree| self.catalog_state.view(tree, self.store.selected()));

        let report = self
            .store
            .series()
            .map(|series| SeriesReport::build(series, self.store.excluded(), &self.config));

        let hovered = match (&report, &self.hovered) {
            (Some(report), Some(id)) => report.chart.as_ref().and_then(|chart| chart.tooltip(id)),
            _ => None,
        };

        let series_status = self.store.status();
        let placeholder = match &series_status {
            SeriesStatus::Idle if matches!(&self.catalog, CatalogSlot::Ready(tree) if tree.is_empty()) => {
                Some(NO_ANALYTES_PLACEHOLDER)
            }
            SeriesStatus::Idle => Some(SELECT_PLACEHOLDER),
            SeriesStatus::Loading { .. } => None,
            SeriesStatus::Empty { .. } | SeriesStatus::Failed { .. } => Some(NO_DATA_PLACEHOLDER),
            SeriesStatus::Ready { .. } => {
                let has_data = report.as_ref().map_or(false, SeriesReport::has_data);
                (!has_data).then_some(NO_DATA_PLACEHOLDER)
            }
        };

        LabsView {
            catalog_status: self.catalog_status(),
            catalog,
            selected: self.store.selected().map(str::to_string),
            series_status,
            report,
            hovered,
            placeholder: placeholder.map(str::to_string),
        }
    }
}
