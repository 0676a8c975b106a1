use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use asset_grid::controller::Controller;
use asset_grid::domain::{GridConfig, GridError};
use asset_grid::model::{Model, Status};
use asset_grid::source::{FileSource, RowSource};
use asset_grid::ui::TableUI;
use asset_grid::views::{CategoryLookup, ViewKind};

/// Browse asset listings, blog posts, categories and contacts in a terminal data grid.
#[derive(Parser, Debug)]
#[command(name = "asset-grid")]
#[command(version, about, long_about = None)]
struct Args {
    /// csv, parquet, arrow or json file holding the rows
    path: String,

    /// Which list view to show the rows in
    #[arg(long, value_enum, default_value = "assets")]
    view: ViewKind,

    /// File with categories, used to label the category column of assets
    #[arg(long)]
    categories: Option<String>,

    /// Rows per page, overrides the view's default
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    page_size: Option<usize>,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Maximum number of body lines
    #[arg(long)]
    max_height: Option<u16>,

    /// Rows without spacing
    #[arg(long)]
    compact: bool,

    /// Column separators
    #[arg(long)]
    bordered: bool,

    /// Alternate row backgrounds
    #[arg(long)]
    striped: bool,

    /// Keep the header visible while rows scroll
    #[arg(long)]
    sticky_header: bool,

    #[arg(long, default_value = "asset-grid.log")]
    log_file: String,

    #[arg(long, default_value_t = 100)]
    event_poll_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&expand(&args.log_file)) {
        eprintln!("Error: could not open log file: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &Path) -> Result<(), GridError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).map(|p| p.into_owned()).unwrap_or_else(|_| path.to_string()))
}

fn run(args: Args) -> Result<(), GridError> {
    info!("Starting asset-grid with {args:?}");

    let source = FileSource::open(expand(&args.path))?;
    let categories = match &args.categories {
        Some(path) => {
            let rows = FileSource::open(expand(path))?.fetch_rows()?;
            CategoryLookup::from_records(&rows)
        }
        None => CategoryLookup::default(),
    };
    info!("Resolved {} categories", categories.len());

    let cfg = GridConfig::default()
        .event_poll_time(args.event_poll_ms)
        .max_column_width(args.max_column_width)
        .page_size(args.page_size)
        .max_height(args.max_height)
        .compact(args.compact)
        .bordered(args.bordered)
        .striped(args.striped)
        .sticky_header(args.sticky_header);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;

    let mut model = Model::init(
        &cfg,
        args.view,
        Box::new(source),
        &categories,
        size.width.into(),
        size.height.into(),
    );
    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}
