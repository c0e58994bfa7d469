use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doc_model::{StoreAction, ViewMode};
use pdf_editor_core::{Editor, EditorConfig};
use pdf_engine::LopdfBackend;
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use storage::Storage;
use viewer_core::{page_height, page_width, render_plan, LazyPages, PageView, ViewerInput, ViewportState};

#[derive(Debug, Parser)]
#[command(name = "pdf-editor")]
#[command(about = "Page-level PDF editor")]
pub struct Cli {
    /// Log operations at debug level (RUST_LOG still takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Editor config file; defaults to the stored user config.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Apply page edits and write the result.
    Edit(EditArgs),
    /// Print the render plan a viewer would paint.
    Plan(PlanArgs),
    /// Print CLI version.
    Version,
}

#[derive(Debug, clap::Args)]
struct EditArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    #[arg(long, short, value_name = "OUT")]
    output: PathBuf,
    /// 1-based pages to select, e.g. `1,3`.
    #[arg(long, value_delimiter = ',')]
    select: Vec<usize>,
    /// 1-based active page (blank pages are inserted after it).
    #[arg(long)]
    active: Option<usize>,
    /// Rotate the selection by this many degrees (multiple of 90).
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<i32>,
    /// Move the page shown at FROM to TO (1-based), applied in order.
    #[arg(long = "move", value_name = "FROM:TO")]
    moves: Vec<PageMove>,
    /// Delete the selected pages.
    #[arg(long)]
    delete: bool,
    /// Insert a blank page after the active page.
    #[arg(long)]
    insert_blank: bool,
    /// Confirm destructive edits.
    #[arg(long, short)]
    yes: bool,
}

#[derive(Debug, clap::Args)]
struct PlanArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    #[arg(long, value_enum)]
    view: Option<ViewArg>,
    /// 1-based active page for single-page view.
    #[arg(long, default_value_t = 1)]
    active: usize,
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
    #[arg(long)]
    container_width: Option<f32>,
    #[arg(long, default_value_t = 800.0)]
    viewport_height: f32,
    #[arg(long, default_value_t = 0.0)]
    scroll: f32,
    #[arg(long)]
    text_select: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Continuous,
    Single,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Continuous => ViewMode::Continuous,
            ViewArg::Single => ViewMode::SinglePage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageMove {
    from: usize,
    to: usize,
}

impl FromStr for PageMove {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (from, to) = value.split_once(':').ok_or_else(|| format!("expected FROM:TO, got `{value}`"))?;
        let parse = |part: &str| part.trim().parse::<usize>().map_err(|error| format!("`{part}`: {error}"));

        Ok(Self { from: parse(from)?, to: parse(to)? })
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: usize,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    width: f32,
    height: f32,
    rotation: i32,
}

#[derive(Debug, Serialize)]
struct EditOutput {
    output: String,
    page_count: usize,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    page_width: f32,
    /// One-based visual page under the viewport center; absent for an empty document.
    current_page: Option<usize>,
    pages: Vec<PageView>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Edit(args) => run_edit(args, cli.config.as_deref()),
        Commands::Plan(args) => run_plan(args, cli.config.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

fn run_info(file: &Path) -> Result<()> {
    let bytes = read_pdf(file)?;
    let operations = pdf_engine::default_operations();

    let sizes = operations.page_sizes(&bytes).context("failed to open PDF")?;
    let rotations = operations.page_rotations(&bytes).context("failed to open PDF")?;

    let pages = sizes
        .into_iter()
        .zip(rotations)
        .map(|(size, rotation)| PageOutput { width: size.width_pt, height: size.height_pt, rotation })
        .collect::<Vec<_>>();

    let payload = InfoOutput { path: file.display().to_string(), page_count: pages.len(), pages };
    print_json(&payload)
}

fn run_edit(args: EditArgs, config_path: Option<&Path>) -> Result<()> {
    let mut editor = open_editor(&args.file, config_path)?;
    let page_count = editor.state().page_count;

    let selection = args
        .select
        .iter()
        .map(|&page| to_index(page, page_count, "--select"))
        .collect::<Result<BTreeSet<_>>>()?;
    for index in selection {
        editor.toggle_selection(index, true);
    }

    if let Some(page) = args.active {
        editor.set_active_page(to_index(page, page_count, "--active")?);
    }

    if let Some(degrees) = args.rotate {
        editor.rotate_selection(degrees).context("failed to rotate pages")?;
    }

    for PageMove { from, to } in args.moves {
        let from = to_index(from, page_count, "--move")?;
        let to = to_index(to, page_count, "--move")?;
        editor.move_visual_page(from, to).context("failed to move page")?;
    }

    if args.delete {
        let requested = Cell::new(0);
        let deleted = editor
            .delete_selection(|count| {
                requested.set(count);
                args.yes
            })
            .context("failed to delete pages")?;

        if !deleted && requested.get() > 0 {
            anyhow::bail!("refusing to delete {} page(s) without --yes", requested.get());
        }
    }

    if args.insert_blank {
        editor.insert_blank_after_active().context("failed to insert blank page")?;
    }

    let bytes = editor.document_bytes().context("failed to save changes")?;

    if let Some(parent) = args.output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, &bytes)
        .with_context(|| format!("failed to write PDF to {}", args.output.display()))?;

    let payload =
        EditOutput { output: args.output.display().to_string(), page_count: editor.state().page_count };
    print_json(&payload)
}

fn run_plan(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let mut editor = open_editor(&args.file, config_path)?;
    let page_count = editor.state().page_count;

    let active = to_index(args.active, page_count.max(1), "--active")?;
    let store = editor.store_mut();
    if let Some(view) = args.view {
        store.dispatch(StoreAction::SetViewMode(view.into()));
    }
    store.dispatch(StoreAction::SetActivePage(active));
    store.dispatch(StoreAction::SetScale(args.scale));
    store.dispatch(StoreAction::SetTextSelectMode(args.text_select));

    let input = ViewerInput::from_state(editor.state());
    let width = page_width(args.container_width, input.scale);

    let document = editor.state().document.clone().context("no document loaded")?;
    let operations = editor.operations();
    let sizes = operations.page_sizes(&document)?;
    let intrinsic = operations.page_rotations(&document)?;

    let page_heights_px = input
        .page_order
        .iter()
        .enumerate()
        .map(|(visual_index, &original)| {
            let size = sizes[original];
            let rotation = intrinsic[original] + input.rotation_at(visual_index);
            page_height(size.width_pt, size.height_pt, rotation, width)
        })
        .collect();

    let viewport = ViewportState {
        mode: input.view_mode,
        viewport_height_px: args.viewport_height,
        scroll_offset_px: args.scroll,
        page_heights_px,
        ..ViewportState::default()
    };

    let mut lazy = LazyPages::new(editor.config().lazy_margin_px);
    lazy.sync(input.version, input.global_rotation);
    lazy.observe(&viewport);

    let current_page =
        (!input.page_order.is_empty()).then(|| viewport.current_page(input.safe_active_page()) + 1);

    let payload =
        PlanOutput { page_width: width, current_page, pages: render_plan(&input, width, &lazy) };
    print_json(&payload)
}

fn open_editor(file: &Path, config_path: Option<&Path>) -> Result<Editor<LopdfBackend>> {
    let bytes = read_pdf(file)?;
    let mut editor = Editor::with_config(load_config(config_path)?);
    editor.open(bytes).context("failed to open PDF")?;
    Ok(editor)
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = path {
        return storage::load_config_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match Storage::from_default_project() {
        Ok(storage) => storage.load_config().context("failed to load stored config"),
        Err(error) => {
            log::warn!("{error}; using default config");
            Ok(EditorConfig::default())
        }
    }
}

fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn to_index(page: usize, page_count: usize, flag: &str) -> Result<usize> {
    if page == 0 || page > page_count {
        anyhow::bail!("{flag} page {page} is out of range 1..={page_count}");
    }

    Ok(page - 1)
}

fn print_json(payload: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_move_parses_from_to_pairs() {
        assert_eq!("5:1".parse::<PageMove>(), Ok(PageMove { from: 5, to: 1 }));
        assert!("5".parse::<PageMove>().is_err());
        assert!("a:1".parse::<PageMove>().is_err());
    }

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(to_index(1, 3, "--select").expect("in range"), 0);
        assert!(to_index(0, 3, "--select").is_err());
        assert!(to_index(4, 3, "--select").is_err());
    }
}
