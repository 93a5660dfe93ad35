//! Thành phần giao diện phân tích xét nghiệm cho môi trường WebAssembly.

#[cfg(target_arch = "wasm32")]
mod styles;

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use std::rc::Rc;

    use crate::styles;
    use js_sys::{Function, Promise};
    use labs_core::catalog::{AnalyteEntry, CategoryEntry};
    use labs_core::chart::AxisTick;
    use labs_core::report::{SeriesHeader, TableRow};
    use labs_core::{
        CatalogStatus, CatalogView, ChartModel, DeviationBand, FetchRequest, LabsConfig,
        LabsController, LabsError, LabsView, MarkerState, PointId, SeriesReport, SummaryCards,
        Tooltip,
    };
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::{spawn_local, JsFuture};
    use web_sys::{console, Document, Element, HtmlInputElement, Window};
    use yew::events::{InputEvent, MouseEvent};
    use yew::prelude::*;
    use yew::TargetCast;

    /// Hai hàm JS trả về Promise của payload `/labs/analytes` và `/labs/timeseries`.
    #[derive(Clone)]
    pub struct JsFetchers {
        catalog: Function,
        series: Function,
    }

    impl PartialEq for JsFetchers {
        fn eq(&self, other: &Self) -> bool {
            let lhs: &JsValue = self.catalog.as_ref();
            let rhs: &JsValue = other.catalog.as_ref();
            let lhs_series: &JsValue = self.series.as_ref();
            let rhs_series: &JsValue = other.series.as_ref();
            lhs == rhs && lhs_series == rhs_series
        }
    }

    enum LabsAction {
        CatalogLoaded(Result<labs_core::CategoryTree, LabsError>),
        ReloadCatalog,
        SeriesLoaded(FetchRequest, Result<labs_core::AnalyteSeries, LabsError>),
        Select(String),
        Retry,
        TogglePoint(PointId),
        Search(String),
        ToggleCategory(String),
        Hover(f64, f64),
        ClearHover,
    }

    #[derive(Clone, PartialEq)]
    struct LabsState {
        controller: LabsController,
    }

    impl Reducible for LabsState {
        type Action = LabsAction;

        fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
            let mut controller = self.controller.clone();
            match action {
                LabsAction::CatalogLoaded(result) => {
                    controller.load_catalog(result);
                }
                LabsAction::ReloadCatalog => controller.reload_catalog(),
                LabsAction::SeriesLoaded(request, result) => {
                    controller.receive_series(&request, result);
                }
                LabsAction::Select(name) => {
                    controller.select_analyte(&name);
                }
                LabsAction::Retry => {
                    controller.retry();
                }
                LabsAction::TogglePoint(id) => {
                    controller.toggle_point(&id);
                }
                LabsAction::Search(query) => controller.set_search(&query),
                LabsAction::ToggleCategory(name) => controller.toggle_category(&name),
                LabsAction::Hover(x, y) => {
                    controller.hover_at(x, y);
                }
                LabsAction::ClearHover => controller.clear_hover(),
            }
            Rc::new(Self { controller })
        }
    }

    #[derive(Properties, PartialEq)]
    pub struct LabsViewProps {
        pub fetchers: JsFetchers,
        pub config: LabsConfig,
    }

    #[function_component(LabsPage)]
    fn labs_page(props: &LabsViewProps) -> Html {
        use_effect_with((), |_| {
            if let Some(window) = web_sys::window() {
                if let Some(document) = window.document() {
                    if let Err(err) = styles::ensure_styles(&document) {
                        console::error_1(&err);
                    }
                }
            }
            || ()
        });

        let state = {
            let config = props.config.clone();
            use_reducer(move || LabsState {
                controller: LabsController::new(config),
            })
        };

        let catalog_loading = state.controller.catalog_status() == CatalogStatus::Loading;
        {
            let dispatcher = state.dispatcher();
            let fetcher = props.fetchers.catalog.clone();
            use_effect_with(catalog_loading, move |loading| {
                if *loading {
                    spawn_local(async move {
                        let result = call_fetcher(&fetcher, None)
                            .await
                            .and_then(|payload| labs_wire::parse_catalog_value(&payload));
                        dispatcher.dispatch(LabsAction::CatalogLoaded(result));
                    });
                }
                || ()
            });
        }

        let pending = state.controller.pending_request().cloned();
        {
            let dispatcher = state.dispatcher();
            let fetcher = props.fetchers.series.clone();
            use_effect_with(pending, move |pending| {
                if let Some(request) = pending.clone() {
                    spawn_local(async move {
                        let result = call_fetcher(&fetcher, Some(&request.analyte))
                            .await
                            .and_then(|payload| labs_wire::parse_series_value(&payload));
                        dispatcher.dispatch(LabsAction::SeriesLoaded(request, result));
                    });
                }
                || ()
            });
        }

        let view = state.controller.view();
        let dispatch = {
            let state = state.clone();
            Callback::from(move |action: LabsAction| state.dispatch(action))
        };

        html! {
            <div class="labs-root">
                <aside class="labs-sidebar">
                    <header class="labs-sidebar-header">
                        <span aria-hidden="true">{"🧪"}</span>
                        <h3>{"Выберите анализ"}</h3>
                    </header>
                    { render_catalog(&view, &dispatch) }
                </aside>
                <section class="labs-main" aria-live="polite">
                    { render_selection(&view) }
                    { render_chart_panel(&view, &dispatch) }
                </section>
            </div>
        }
    }

    fn render_catalog(view: &LabsView, dispatch: &Callback<LabsAction>) -> Html {
        match (&view.catalog_status, &view.catalog) {
            (CatalogStatus::Loading, _) => html! {
                <p class="labs-muted">{"Загрузка каталога..."}</p>
            },
            (CatalogStatus::Failed { message }, _) => {
                let onclick = dispatch.reform(|_: MouseEvent| LabsAction::ReloadCatalog);
                html! {
                    <div class="labs-error">
                        <p>{ message.clone() }</p>
                        <button type="button" onclick={onclick}>{"Повторить"}</button>
                    </div>
                }
            }
            (CatalogStatus::Ready, Some(catalog)) => render_catalog_tree(catalog, dispatch),
            (CatalogStatus::Ready, None) => Html::default(),
        }
    }

    fn render_catalog_tree(catalog: &CatalogView, dispatch: &Callback<LabsAction>) -> Html {
        let on_search = dispatch.reform(|event: InputEvent| {
            let input: HtmlInputElement = event.target_unchecked_into();
            LabsAction::Search(input.value())
        });

        html! {
            <>
                <div class="labs-search">
                    <input
                        type="search"
                        placeholder={format!("Поиск среди {} анализов...", catalog.total_analytes)}
                        value={catalog.query.clone()}
                        oninput={on_search}
                        aria-label="Поиск анализа"
                    />
                </div>
                {
                    if catalog.is_empty() {
                        html! { <p class="labs-muted">{"Анализы не найдены"}</p> }
                    } else {
                        html! {
                            <ul class="labs-categories">
                                { for catalog.categories.iter().map(|category| render_category(category, dispatch)) }
                            </ul>
                        }
                    }
                }
            </>
        }
    }

    fn render_category(category: &CategoryEntry, dispatch: &Callback<LabsAction>) -> Html {
        let name = category.name.clone();
        let on_toggle = dispatch.reform(move |_: MouseEvent| LabsAction::ToggleCategory(name.clone()));

        html! {
            <li class={classes!("labs-category", category.expanded.then_some("is-expanded"))}>
                <button type="button" class="labs-category-toggle" onclick={on_toggle}>
                    <span aria-hidden="true">{ category.icon.clone() }</span>
                    <span class="labs-category-name">{ category.name.clone() }</span>
                    <span class="labs-count">{ category.analyte_count }</span>
                </button>
                {
                    if category.expanded {
                        html! {
                            <ul class="labs-analytes">
                                { for category.analytes.iter().map(|analyte| render_analyte(analyte, dispatch)) }
                            </ul>
                        }
                    } else {
                        Html::default()
                    }
                }
            </li>
        }
    }

    fn render_analyte(analyte: &AnalyteEntry, dispatch: &Callback<LabsAction>) -> Html {
        let name = analyte.canonical_name.clone();
        let onclick = dispatch.reform(move |_: MouseEvent| LabsAction::Select(name.clone()));

        html! {
            <li>
                <button
                    type="button"
                    class={classes!("labs-analyte", analyte.selected.then_some("is-selected"))}
                    onclick={onclick}
                >
                    <span>{ analyte.canonical_name.clone() }</span>
                    <span class="labs-muted">
                        { analyte.standard_unit.clone().unwrap_or_default() }
                        {" · "}
                        { analyte.measurement_count }
                    </span>
                </button>
            </li>
        }
    }

    fn render_selection(view: &LabsView) -> Html {
        let Some(selected) = view.selected.as_ref() else {
            return Html::default();
        };
        let header: Option<&SeriesHeader> = view.report.as_ref().map(|report| &report.header);

        html! {
            <div class="labs-selection">
                <span class="labs-muted">{"Выбран:"}</span>
                <strong>{ selected.clone() }</strong>
                {
                    header
                        .and_then(|header| header.display_unit.clone())
                        .map(|unit| html! { <span class="labs-tag">{ format!("Единица измерения: {unit}") }</span> })
                        .unwrap_or_default()
                }
                {
                    header
                        .and_then(|header| header.category.clone())
                        .map(|category| html! { <span class="labs-tag">{ format!("Категория: {category}") }</span> })
                        .unwrap_or_default()
                }
            </div>
        }
    }

    fn render_chart_panel(view: &LabsView, dispatch: &Callback<LabsAction>) -> Html {
        let body = if view.series_status.is_loading() {
            html! { <p class="labs-muted">{"Загрузка данных..."}</p> }
        } else {
            match &view.report {
                Some(report) => render_report(report, view.hovered.as_ref(), dispatch),
                None => Html::default(),
            }
        };

        let retry = if view.series_status.is_no_data() && view.report.is_none() {
            let onclick = dispatch.reform(|_: MouseEvent| LabsAction::Retry);
            html! { <button type="button" class="labs-retry" onclick={onclick}>{"Повторить"}</button> }
        } else {
            Html::default()
        };

        html! {
            <section class="labs-panel">
                <h3>{"📊 График динамики"}</h3>
                {
                    view.placeholder
                        .as_ref()
                        .filter(|_| view.report.as_ref().map_or(true, |report| report.table.is_empty()))
                        .map(|text| html! {
                            <div class="labs-placeholder">
                                <span aria-hidden="true">{"📈"}</span>
                                <p>{ text.clone() }</p>
                            </div>
                        })
                        .unwrap_or_default()
                }
                { retry }
                { body }
            </section>
        }
    }

    fn render_report(
        report: &SeriesReport,
        hovered: Option<&Tooltip>,
        dispatch: &Callback<LabsAction>,
    ) -> Html {
        html! {
            <>
                { report.summary.as_ref().map(render_cards).unwrap_or_default() }
                {
                    match report.chart.as_ref() {
                        Some(chart) => render_chart(chart, hovered, dispatch),
                        None => html! { <p class="labs-muted">{"Нет данных для отображения"}</p> },
                    }
                }
                { render_table(report, dispatch) }
            </>
        }
    }

    fn render_cards(summary: &SummaryCards) -> Html {
        let unit = summary.unit.clone().unwrap_or_default();
        let trend_level = format!("{:?}", summary.trend.direction).to_lowercase();

        html! {
            <div class="labs-cards">
                <div class="labs-card" data-kind="min">
                    <span class="labs-card-label">{"Минимум"}</span>
                    <strong>{ summary.min.clone() }</strong>
                    <span class="labs-muted">{ unit.clone() }</span>
                </div>
                <div class="labs-card" data-kind="max">
                    <span class="labs-card-label">{"Максимум"}</span>
                    <strong>{ summary.max.clone() }</strong>
                    <span class="labs-muted">{ unit.clone() }</span>
                </div>
                <div class="labs-card" data-kind="mean">
                    <span class="labs-card-label">{"Среднее"}</span>
                    <strong>{ summary.mean.clone() }</strong>
                    <span class="labs-muted">{ unit }</span>
                </div>
                <div class="labs-card" data-kind="trend" data-trend={trend_level}>
                    <span class="labs-card-label">{"Тренд"}</span>
                    <strong>{ summary.trend_value.clone() }</strong>
                    <span class="labs-muted">{ summary.trend_caption.clone() }</span>
                </div>
            </div>
        }
    }

    fn render_chart(
        chart: &ChartModel,
        hovered: Option<&Tooltip>,
        dispatch: &Callback<LabsAction>,
    ) -> Html {
        let width = chart.viewport.width;
        let height = chart.viewport.height;
        let plot = chart.plot;

        let on_move = {
            let dispatch = dispatch.clone();
            Callback::from(move |event: MouseEvent| {
                if let Some((x, y)) = pointer_in_chart(&event, width, height) {
                    dispatch.emit(LabsAction::Hover(x, y));
                }
            })
        };
        let on_leave = dispatch.reform(|_: MouseEvent| LabsAction::ClearHover);

        html! {
            <svg
                class="labs-chart"
                viewBox={format!("0 0 {width} {height}")}
                preserveAspectRatio="xMidYMid meet"
                onmousemove={on_move}
                onmouseleave={on_leave}
            >
                <g class="labs-grid">
                    { for chart.y_ticks.iter().map(|tick| render_y_tick(tick, plot.left, plot.right())) }
                    { for chart.x_ticks.iter().map(|tick| render_x_tick(tick, plot.top, plot.bottom())) }
                </g>
                <path class="labs-area" d={chart.area_path()} />
                <path class="labs-line" d={chart.line_path()} />
                <line
                    class="labs-mean"
                    x1={plot.left.to_string()}
                    x2={plot.right().to_string()}
                    y1={chart.mean_y.to_string()}
                    y2={chart.mean_y.to_string()}
                />
                <text class="labs-mean-label" x={(plot.right() - 4.0).to_string()} y={(chart.mean_y - 6.0).to_string()} text-anchor="end">
                    { chart.mean_label.clone() }
                </text>
                <g class="labs-markers">
                    {
                        for chart.markers.iter().map(|marker| {
                            let id = marker.id.clone();
                            let onclick = dispatch.reform(move |_: MouseEvent| LabsAction::TogglePoint(id.clone()));
                            let is_hovered = hovered.map_or(false, |tooltip| tooltip.id == marker.id);
                            html! {
                                <circle
                                    class={classes!(
                                        "labs-marker",
                                        (marker.state == MarkerState::Excluded).then_some("is-excluded"),
                                        is_hovered.then_some("is-hovered")
                                    )}
                                    cx={marker.x.to_string()}
                                    cy={marker.y.to_string()}
                                    r={if is_hovered { "7" } else { "5" }}
                                    onclick={onclick}
                                />
                            }
                        })
                    }
                </g>
                <text class="labs-axis-label" x={(plot.left + plot.width / 2.0).to_string()} y={(height - 12.0).to_string()} text-anchor="middle">
                    { chart.date_axis_label.clone() }
                </text>
                <text
                    class="labs-axis-label"
                    x="16"
                    y={(plot.top + plot.height / 2.0).to_string()}
                    text-anchor="middle"
                    transform={format!("rotate(-90 16 {})", plot.top + plot.height / 2.0)}
                >
                    { chart.value_axis_label.clone() }
                </text>
                { hovered.map(|tooltip| render_tooltip(tooltip, width)).unwrap_or_default() }
            </svg>
        }
    }

    fn render_y_tick(tick: &AxisTick, left: f64, right: f64) -> Html {
        html! {
            <g>
                <line x1={left.to_string()} x2={right.to_string()} y1={tick.position.to_string()} y2={tick.position.to_string()} />
                <text x={(left - 8.0).to_string()} y={(tick.position + 4.0).to_string()} text-anchor="end">
                    { tick.label.clone() }
                </text>
            </g>
        }
    }

    fn render_x_tick(tick: &AxisTick, top: f64, bottom: f64) -> Html {
        html! {
            <g>
                <line x1={tick.position.to_string()} x2={tick.position.to_string()} y1={top.to_string()} y2={bottom.to_string()} />
                <text x={tick.position.to_string()} y={(bottom + 20.0).to_string()} text-anchor="middle">
                    { tick.label.clone() }
                </text>
            </g>
        }
    }

    fn render_tooltip(tooltip: &Tooltip, width: f64) -> Html {
        const BOX_WIDTH: f64 = 150.0;
        let x = (tooltip.x - BOX_WIDTH / 2.0).clamp(0.0, (width - BOX_WIDTH).max(0.0));
        let y = (tooltip.y - 58.0).max(0.0);

        html! {
            <g class="labs-tooltip" transform={format!("translate({x} {y})")}>
                <rect width={BOX_WIDTH.to_string()} height="46" rx="8" />
                <text x="10" y="18">{ tooltip.date_label.clone() }</text>
                <text x="10" y="36" class="labs-tooltip-value">{ tooltip.value_label.clone() }</text>
            </g>
        }
    }

    fn render_table(report: &SeriesReport, dispatch: &Callback<LabsAction>) -> Html {
        if report.table.is_empty() {
            return Html::default();
        }

        html! {
            <section class="labs-table">
                <header>
                    <h4>{"Таблица значений"}</h4>
                    {
                        report.exclusion.label()
                            .map(|label| html! { <span class="labs-tag">{ label }</span> })
                            .unwrap_or_default()
                    }
                </header>
                <table>
                    <thead>
                        <tr>
                            <th>{"✓"}</th>
                            <th>{"№"}</th>
                            <th>{"Дата"}</th>
                            <th>{"Значение"}</th>
                            <th>{"Отклонение от среднего"}</th>
                        </tr>
                    </thead>
                    <tbody>
                        { for report.table.iter().map(|row| render_row(row, dispatch)) }
                    </tbody>
                </table>
            </section>
        }
    }

    fn render_row(row: &TableRow, dispatch: &Callback<LabsAction>) -> Html {
        let id = row.id.clone();
        let onchange = dispatch.reform(move |_: Event| LabsAction::TogglePoint(id.clone()));
        let deviation = match &row.deviation {
            Some(badge) => {
                let level = match badge.band {
                    DeviationBand::Normal => "normal",
                    DeviationBand::Above => "above",
                    DeviationBand::Below => "below",
                };
                html! { <span class="labs-deviation" data-band={level}>{ badge.label.clone() }</span> }
            }
            None => html! { <span class="labs-muted">{"—"}</span> },
        };

        html! {
            <tr class={classes!((!row.included).then_some("is-excluded"))}>
                <td>
                    <input type="checkbox" checked={row.included} onchange={onchange} aria-label="Учитывать в расчётах" />
                </td>
                <td>{ row.ordinal }</td>
                <td>{ row.date_label.clone() }</td>
                <td>{ row.value_label.clone() }</td>
                <td>{ deviation }</td>
            </tr>
        }
    }

    /// Đổi toạ độ con trỏ sang hệ toạ độ `viewBox` của biểu đồ.
    fn pointer_in_chart(event: &MouseEvent, width: f64, height: f64) -> Option<(f64, f64)> {
        let target: Element = event.current_target()?.dyn_into().ok()?;
        let rect = target.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return None;
        }
        let x = (f64::from(event.client_x()) - rect.left()) * width / rect.width();
        let y = (f64::from(event.client_y()) - rect.top()) * height / rect.height();
        Some((x, y))
    }

    async fn call_fetcher(
        fetcher: &Function,
        argument: Option<&str>,
    ) -> Result<serde_json::Value, LabsError> {
        let returned = match argument {
            Some(argument) => fetcher.call1(&JsValue::NULL, &JsValue::from_str(argument)),
            None => fetcher.call0(&JsValue::NULL),
        }
        .map_err(|err| LabsError::FetchFailure(describe_js_error(&err)))?;

        let payload = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|err| LabsError::FetchFailure(describe_js_error(&err)))?;

        from_value::<serde_json::Value>(payload).map_err(|err| LabsError::Parse(err.to_string()))
    }

    fn describe_js_error(err: &JsValue) -> String {
        err.as_string()
            .or_else(|| {
                err.dyn_ref::<js_sys::Error>()
                    .map(|error| String::from(error.message()))
            })
            .unwrap_or_else(|| format!("{err:?}"))
    }

    #[wasm_bindgen]
    pub fn mount_labs_view(
        selector: &str,
        fetch_catalog: Function,
        fetch_series: Function,
        config: Option<JsValue>,
    ) -> Result<(), JsValue> {
        let window: Window =
            web_sys::window().ok_or_else(|| JsValue::from_str("Không có window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Không truy cập được document"))?;

        let target: Element = document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("Selector lỗi: {err:?}")))?
            .ok_or_else(|| JsValue::from_str("Không tìm thấy element theo selector"))?;

        let config: LabsConfig = match config {
            Some(value) => from_value(value)?,
            None => LabsConfig::default(),
        };

        let fetchers = JsFetchers {
            catalog: fetch_catalog,
            series: fetch_series,
        };

        yew::Renderer::<LabsPage>::with_root_and_props(target, LabsViewProps { fetchers, config })
            .render();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::mount_labs_view;

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_labs_view(
    _: &str,
    _: js_sys::Function,
    _: js_sys::Function,
    _: Option<wasm_bindgen::JsValue>,
) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "labs-ui chỉ hỗ trợ biên dịch target wasm32",
    ))
}
