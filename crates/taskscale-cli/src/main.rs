mod config;
mod loader;
mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use taskscale_core::{
    aggregate, build_report, classify, compare, periods_by_month, render_report, Aggregation,
    CacheKey, ChartMetric, CompareOptions, Dimension, Period, Report, ReportCache, ReportOptions,
    DEFAULT_TOP_N,
};

use config::TaskscaleConfig;

#[derive(Parser)]
#[command(name = "taskscale")]
#[command(author, version, about = "Task analytics by market, user, product and AI usage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Break tasks down by one or two dimensions")]
    Table {
        #[arg(short, long, help = "Task file or directory of *.json files")]
        input: PathBuf,
        #[arg(long, required = true, num_args = 1, help = "Dimension (market, user, category, subcategory, product, ai-model, reporter, month, external-asset); repeat for a second")]
        by: Vec<Dimension>,
        #[arg(long, help = "Users/reporters file for labels")]
        users: Option<PathBuf>,
        #[arg(long, help = "Hide the hours column")]
        no_hours: bool,
        #[arg(long, help = "Hide the grand total row")]
        no_total: bool,
        #[arg(long, help = "Show tasks with no value for the dimension")]
        unassigned: bool,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Chart series for one dimension")]
    Chart {
        #[arg(short, long, help = "Task file or directory of *.json files")]
        input: PathBuf,
        #[arg(long, help = "Dimension to chart")]
        by: Dimension,
        #[arg(long, default_value = "tasks", help = "tasks, hours or both")]
        metric: ChartMetric,
        #[arg(long, help = "Keep only the top N values")]
        top: Option<usize>,
        #[arg(long, help = "Users/reporters file for labels")]
        users: Option<PathBuf>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Compare two or three periods")]
    Compare {
        #[arg(long = "period", required = true, help = "Task file or directory for one period; repeat 2-3 times")]
        periods: Vec<PathBuf>,
        #[arg(long, help = "Keep only the top N values per breakdown")]
        top: Option<usize>,
        #[arg(long, help = "Users/reporters file for labels")]
        users: Option<PathBuf>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Compare calendar months of one task list")]
    Months {
        #[arg(short, long, help = "Task file or directory of *.json files")]
        input: PathBuf,
        #[arg(long = "month", required = true, help = "Month as YYYY-MM; repeat 2-3 times")]
        months: Vec<String>,
        #[arg(long, help = "Keep only the top N values per breakdown")]
        top: Option<usize>,
        #[arg(long, help = "Users/reporters file for labels")]
        users: Option<PathBuf>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Show the category and subcategory of product strings")]
    Classify {
        #[arg(required = true)]
        products: Vec<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Market, product and user overview")]
    Dashboard {
        #[arg(short, long, help = "Task file or directory of *.json files")]
        input: PathBuf,
        #[arg(long, help = "Keep only the top N values per chart")]
        top: Option<usize>,
        #[arg(long, help = "Users/reporters file for labels")]
        users: Option<PathBuf>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

fn init_logging(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        Some(EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().ok()
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = TaskscaleConfig::load();

    match cli.command {
        Commands::Table {
            input,
            by,
            users,
            no_hours,
            no_total,
            unassigned,
            json,
        } => {
            let options = ReportOptions {
                include_hours: !no_hours,
                include_grand_total: !no_total,
                include_unassigned: unassigned,
                include_chart: false,
                ..ReportOptions::default()
            };
            run_table(&input, &by, users.as_deref(), options, json, config)
        }
        Commands::Chart {
            input,
            by,
            metric,
            top,
            users,
            json,
        } => {
            let options = ReportOptions {
                include_table: false,
                top_n: Some(top.or(config.top_n).unwrap_or(DEFAULT_TOP_N)),
                metric,
                ..ReportOptions::default()
            };
            run_chart(&input, by, users.as_deref(), options, json, config)
        }
        Commands::Compare {
            periods,
            top,
            users,
            json,
        } => run_compare(&periods, top, users.as_deref(), json, config),
        Commands::Months {
            input,
            months,
            top,
            users,
            json,
        } => run_months(&input, &months, top, users.as_deref(), json, config),
        Commands::Classify { products, json } => run_classify(&products, json),
        Commands::Dashboard {
            input,
            top,
            users,
            json,
        } => run_dashboard(&input, top, users.as_deref(), json, config),
    }
}

fn run_table(
    input: &Path,
    dimensions: &[Dimension],
    users: Option<&Path>,
    options: ReportOptions,
    json: bool,
    config: &TaskscaleConfig,
) -> Result<()> {
    if dimensions.len() > 2 {
        bail!("--by takes at most two dimensions, got {}", dimensions.len());
    }

    let tasks = loader::load_tasks(input)?;
    let directory = loader::load_directory(users, &tasks)?;
    let palette = config.palette(&directory);
    let report = build_report(&tasks, dimensions, &directory, &palette, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_table(&report);
    }
    Ok(())
}

fn run_chart(
    input: &Path,
    dimension: Dimension,
    users: Option<&Path>,
    options: ReportOptions,
    json: bool,
    config: &TaskscaleConfig,
) -> Result<()> {
    let tasks = loader::load_tasks(input)?;
    let directory = loader::load_directory(users, &tasks)?;
    let palette = config.palette(&directory);
    let report = build_report(&tasks, &[dimension], &directory, &palette, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.chart_series)?);
    } else {
        println!("{}", dimension.title().bold());
        render::print_chart(&report.chart_series);
    }
    Ok(())
}

fn compare_options(top: Option<usize>, config: &TaskscaleConfig) -> CompareOptions {
    CompareOptions {
        top_n: Some(top.or(config.top_n).unwrap_or(DEFAULT_TOP_N)),
    }
}

fn period_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn run_compare(
    paths: &[PathBuf],
    top: Option<usize>,
    users: Option<&Path>,
    json: bool,
    config: &TaskscaleConfig,
) -> Result<()> {
    let periods = paths
        .iter()
        .map(|path| -> Result<Period> { Ok(Period::new(period_label(path), loader::load_tasks(path)?)) })
        .collect::<Result<Vec<_>>>()?;

    let all_tasks: Vec<_> = periods.iter().flat_map(|p| p.tasks.iter().cloned()).collect();
    let directory = loader::load_directory(users, &all_tasks)?;
    let palette = config.palette(&directory);
    let comparison = compare(&periods, &compare_options(top, config), &directory, &palette)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        render::print_comparison(&comparison);
    }
    Ok(())
}

fn run_months(
    input: &Path,
    months: &[String],
    top: Option<usize>,
    users: Option<&Path>,
    json: bool,
    config: &TaskscaleConfig,
) -> Result<()> {
    let tasks = loader::load_tasks(input)?;
    let directory = loader::load_directory(users, &tasks)?;
    let periods = periods_by_month(&tasks, months);
    let palette = config.palette(&directory);
    let comparison = compare(&periods, &compare_options(top, config), &directory, &palette)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        render::print_comparison(&comparison);
    }
    Ok(())
}

fn run_classify(products: &[String], json: bool) -> Result<()> {
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ClassificationJson<'a> {
        products: &'a str,
        category: Option<&'static str>,
        subcategory: &'static str,
        label: String,
    }

    let rows: Vec<ClassificationJson> = products
        .iter()
        .map(|p| {
            let c = classify(p);
            ClassificationJson {
                products: p,
                category: c.category.map(|c| c.as_str()),
                subcategory: c.subcategory.as_str(),
                label: c.label(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Products", "Category", "Subcategory", "Label"]);
        for row in &rows {
            table.add_row(vec![
                row.products.to_string(),
                row.category.unwrap_or("-").to_string(),
                row.subcategory.to_string(),
                row.label.clone(),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}

const DASHBOARD_CARDS: &[(&str, &[Dimension])] = &[
    ("Markets", &[Dimension::Market]),
    ("Products", &[Dimension::Product]),
    ("Users", &[Dimension::User]),
    ("Products by market", &[Dimension::Product, Dimension::Market]),
];

fn run_dashboard(
    input: &Path,
    top: Option<usize>,
    users: Option<&Path>,
    json: bool,
    config: &TaskscaleConfig,
) -> Result<()> {
    let tasks = loader::load_tasks(input)?;
    let directory = loader::load_directory(users, &tasks)?;
    let palette = config.palette(&directory);
    let top_n = Some(top.or(config.top_n).unwrap_or(DEFAULT_TOP_N));

    let mut cache: ReportCache<Aggregation> = ReportCache::new();
    let mut cards: BTreeMap<&str, Report> = BTreeMap::new();

    for (title, dimensions) in DASHBOARD_CARDS {
        let key = CacheKey::new(tasks.len(), dimensions, &[]);
        let aggregation = cache.get_or_try_insert_with(key, || aggregate(&tasks, dimensions))?;
        // Single-dimension cards chart; the cross breakdown is table-only
        let options = ReportOptions {
            include_chart: dimensions.len() == 1,
            top_n,
            ..ReportOptions::default()
        };
        cards.insert(*title, render_report(aggregation, &directory, &palette, &options));
    }

    // The headline reuses the market aggregation
    let headline = cache
        .get_or_try_insert_with(CacheKey::new(tasks.len(), &[Dimension::Market], &[]), || {
            aggregate(&tasks, &[Dimension::Market])
        })?
        .totals;
    let (hits, misses) = cache.stats();
    tracing::debug!(hits, misses, "dashboard aggregation cache");

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} tasks | {} hours",
            headline.task_count,
            render::format_hours(headline.hours)
        )
        .bold()
    );
    for (title, _) in DASHBOARD_CARDS {
        let Some(report) = cards.get(title) else {
            continue;
        };
        println!("\n{}", title.bold());
        if !report.chart_series.is_empty() {
            render::print_chart(&report.chart_series);
            println!();
        }
        render::print_table(report);
    }
    Ok(())
}
