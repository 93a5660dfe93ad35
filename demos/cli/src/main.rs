mod svg;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use labs_core::{CatalogView, LabsConfig, LabsController, LabsView, PointId};
use labs_wire::{parse_catalog_str, parse_series_str};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "labs-cli",
    about = "Phân tích chuỗi xét nghiệm từ payload JSON và xuất biểu đồ SVG."
)]
struct Args {
    /// File JSON của `/labs/analytes`.
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// File JSON của `/labs/timeseries`.
    #[arg(short, long)]
    series: PathBuf,

    /// Id điểm cần loại khỏi thống kê (lặp lại được).
    #[arg(short, long = "exclude")]
    excluded: Vec<String>,

    /// Từ khoá lọc danh mục.
    #[arg(long)]
    search: Option<String>,

    /// Ghi biểu đồ ra file SVG.
    #[arg(long)]
    svg: Option<PathBuf>,

    #[arg(long, default_value_t = 1000.0)]
    width: f64,

    #[arg(long, default_value_t = 400.0)]
    height: f64,

    /// In toàn bộ view dạng JSON thay cho bảng văn bản.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = LabsConfig {
        width: args.width,
        height: args.height,
        ..LabsConfig::default()
    };
    let mut controller = LabsController::new(config);

    if let Some(path) = &args.catalog {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Không đọc được file {path:?}"))?;
        controller.load_catalog(parse_catalog_str(&data));
        if let Some(query) = &args.search {
            controller.set_search(query);
        }
    }

    let data = std::fs::read_to_string(&args.series)
        .with_context(|| format!("Không đọc được file {:?}", args.series))?;
    let series = parse_series_str(&data)?;

    let request = match controller.select_analyte(&series.analyte_name) {
        Some(request) => request,
        None => match controller.pending_request() {
            Some(request) => request.clone(),
            None => bail!("Không tạo được yêu cầu cho {}", series.analyte_name),
        },
    };
    controller.receive_series(&request, Ok(series));

    for id in &args.excluded {
        if !controller.toggle_point(&PointId::from(id.as_str())) {
            tracing::warn!(point = %id, "point id not found in series");
        }
    }

    let view = controller.view();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        if let Some(catalog) = &view.catalog {
            print_catalog(catalog);
        }
        print_report(&view);
    }

    if let Some(path) = &args.svg {
        let Some(chart) = view.report.as_ref().and_then(|report| report.chart.as_ref()) else {
            bail!("Không có điểm nào để vẽ biểu đồ");
        };
        std::fs::write(path, svg::render(chart))
            .with_context(|| format!("Không ghi được file {path:?}"))?;
        tracing::info!(path = %path.display(), "chart written");
    }

    Ok(())
}

fn print_catalog(catalog: &CatalogView) {
    println!("Анализы ({}):", catalog.total_analytes);
    if catalog.is_empty() {
        println!("  Анализы не найдены");
    }
    for category in &catalog.categories {
        let marker = if category.expanded { "▾" } else { "▸" };
        println!(
            "  {marker} {} {} ({})",
            category.icon, category.name, category.analyte_count
        );
        if !category.expanded {
            continue;
        }
        for analyte in &category.analytes {
            let selected = if analyte.selected { "*" } else { " " };
            println!(
                "    {selected} {} [{}] x{}",
                analyte.canonical_name,
                analyte.standard_unit.as_deref().unwrap_or("-"),
                analyte.measurement_count
            );
        }
    }
    println!();
}

fn print_report(view: &LabsView) {
    let Some(report) = &view.report else {
        println!("{}", view.placeholder.as_deref().unwrap_or_default());
        return;
    };

    println!(
        "{} ({})",
        report.header.analyte_name,
        report.header.display_unit.as_deref().unwrap_or("Значение")
    );

    match &report.summary {
        Some(summary) => println!(
            "Минимум: {}  Максимум: {}  Среднее: {}  Тренд: {} {}",
            summary.min, summary.max, summary.mean, summary.trend_value, summary.trend_caption
        ),
        None => println!("{}", view.placeholder.as_deref().unwrap_or_default()),
    }

    if let Some(label) = report.exclusion.label() {
        println!("{label}");
    }

    for row in &report.table {
        let deviation = row
            .deviation
            .as_ref()
            .map(|badge| badge.label.clone())
            .unwrap_or_else(|| "—".to_string());
        let included = if row.included { "x" } else { " " };
        println!(
            "[{included}] {:>3}  {}  {:>14}  {:>8}  {}",
            row.ordinal, row.date_label, row.value_label, deviation, row.id
        );
    }
}
