//! CLI binary for browsing and redeeming coupons from a catalog file.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use coupon_feed::feed::{CouponFeedBlocking, DEFAULT_PAGE_SIZE, PageLoad};
use coupon_feed::interleave::{Cadence, interleave};
use coupon_feed::models::{Category, Coupon, CouponId};
use coupon_feed::source::{BlockingCouponSource, CatalogSource};
use coupon_feed::storage::{BlockingStore, FileStore, keys};
use owo_colors::OwoColorize;

/// Environment variable naming the catalog file.
const CATALOG_ENV: &str = "COUPONS_CATALOG";

/// Environment variable overriding the page size.
const PAGE_SIZE_ENV: &str = "COUPONS_PAGE_SIZE";

/// Coupon feed CLI: browse, filter and redeem coupons.
#[derive(Debug, Parser)]
#[command(name = "coupons", version, about)]
struct Cli {
    /// Override the preferences directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Catalog JSON file (default: $COUPONS_CATALOG).
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,
    /// Coupons per page (default: $COUPONS_PAGE_SIZE or 10).
    #[arg(long, global = true, value_name = "N")]
    page_size: Option<usize>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List the category filters.
    Categories,
    /// Load pages of the feed and print them.
    Browse(BrowseArgs),
    /// Redeem a coupon and save the catalog.
    Redeem {
        /// Coupon id.
        id: CouponId,
        /// Category to page through (default: last browsed).
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Print a JSON coupon array in feed order.
    Interleave {
        /// File holding a JSON array of coupons.
        file: PathBuf,
        /// Regular coupons placed after each merchant group.
        #[arg(long, default_value = "2", value_parser = parse_cadence)]
        cadence: Cadence,
    },
}

/// Arguments for the `browse` subcommand.
#[derive(Debug, Args)]
struct BrowseArgs {
    /// Category filter, by code or label (default: last browsed).
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    /// Maximum number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages: usize,
}

/// Parses a category code or label for clap.
fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|err| format!("{err}"))
}

/// Parses a non-zero cadence for clap.
fn parse_cadence(s: &str) -> Result<Cadence, String> {
    let value: usize = s.parse().map_err(|err| format!("{err}"))?;
    Cadence::new(value).ok_or_else(|| "cadence must be at least 1".to_owned())
}

/// Picks the catalog path from the flag, falling back to the environment.
fn resolve_catalog(flag: Option<PathBuf>, env_value: Option<OsString>) -> Option<PathBuf> {
    flag.or_else(|| env_value.filter(|val| !val.is_empty()).map(PathBuf::from))
}

/// Picks the page size from the flag, the environment, or the default.
fn resolve_page_size(flag: Option<usize>, env_value: Option<&str>) -> Result<usize, String> {
    if let Some(size) = flag {
        return Ok(size);
    }
    match env_value.map(str::trim).filter(|val| !val.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|err| format!("invalid {PAGE_SIZE_ENV} value {raw:?}: {err}")),
        None => Ok(DEFAULT_PAGE_SIZE),
    }
}

/// Reads the catalog path, printing a hint when it is missing.
fn read_catalog_path(flag: Option<PathBuf>) -> io::Result<Option<PathBuf>> {
    if let Some(path) = resolve_catalog(flag, std::env::var_os(CATALOG_ENV)) {
        return Ok(Some(path));
    }
    let mut err = io::stderr().lock();
    writeln!(
        err,
        "{} no catalog given and {} is not set",
        "error:".red().bold(),
        CATALOG_ENV.bold()
    )?;
    writeln!(
        err,
        "  {} pass --catalog <FILE> or add {}=<path> to .env",
        "hint:".cyan(),
        CATALOG_ENV
    )?;
    Ok(None)
}

/// Everything a feed-backed subcommand needs.
#[derive(Debug)]
struct Session {
    /// Feed over the loaded catalog.
    feed: CouponFeedBlocking<CatalogSource>,
    /// Preferences store.
    store: FileStore,
    /// Catalog file the feed was loaded from.
    catalog_path: PathBuf,
}

/// Options shared by the feed-backed subcommands.
#[derive(Debug)]
struct SessionOptions {
    /// Catalog flag value.
    catalog: Option<PathBuf>,
    /// Preferences directory flag value.
    data_dir: Option<PathBuf>,
    /// Page size flag value.
    page_size: Option<usize>,
    /// Requested category, or `None` for the remembered one.
    category: Option<Category>,
}

/// Loads the catalog, opens the store and builds the feed, printing an
/// error for the first step that fails.
fn open_session(options: SessionOptions) -> io::Result<Option<Session>> {
    let env_page_size = std::env::var(PAGE_SIZE_ENV).ok();
    let page_size = match resolve_page_size(options.page_size, env_page_size.as_deref()) {
        Ok(size) => size,
        Err(msg) => {
            writeln!(io::stderr().lock(), "{} {msg}", "error:".red().bold())?;
            return Ok(None);
        }
    };

    let Some(catalog_path) = read_catalog_path(options.catalog)? else {
        return Ok(None);
    };

    let catalog = match CatalogSource::from_path(&catalog_path) {
        Ok(catalog) => catalog,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to load catalog {}: {err}",
                "error:".red().bold(),
                catalog_path.display()
            )?;
            return Ok(None);
        }
    };

    let store = match create_store(options.data_dir) {
        Ok(store) => store,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to initialize preferences: {err}",
                "error:".red().bold()
            )?;
            return Ok(None);
        }
    };

    let category = options
        .category
        .unwrap_or_else(|| remembered_category(&store));
    let Some(feed) = build_feed(catalog, page_size, category)? else {
        return Ok(None);
    };

    Ok(Some(Session {
        feed,
        store,
        catalog_path,
    }))
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut options = SessionOptions {
        catalog: cli.catalog,
        data_dir: cli.data_dir,
        page_size: cli.page_size,
        category: None,
    };

    match cli.command {
        Command::Categories => cmd_categories(),
        Command::Interleave { file, cadence } => cmd_interleave(&file, cadence),
        Command::Browse(args) => {
            options.category = args.category;
            let Some(session) = open_session(options)? else {
                return Ok(ExitCode::FAILURE);
            };
            cmd_browse(&session.feed, &session.store, args.pages)
        }
        Command::Redeem { id, category } => {
            options.category = category;
            let Some(session) = open_session(options)? else {
                return Ok(ExitCode::FAILURE);
            };
            cmd_redeem(&session.feed, id, &session.catalog_path)
        }
    }
}

/// Creates the preferences store, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_store(data_dir: Option<PathBuf>) -> coupon_feed::error::Result<FileStore> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStore::default_dir()?,
    };
    FileStore::new(dir)
}

/// Returns the last browsed category, or [`Category::All`] if none was
/// stored or it cannot be read.
fn remembered_category<S: BlockingStore>(store: &S) -> Category {
    match store.get(keys::LAST_CATEGORY) {
        Ok(Some(code)) => code.parse().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring remembered category");
            Category::All
        }),
        Ok(None) => Category::All,
        Err(err) => {
            tracing::warn!(error = %err, "could not read remembered category");
            Category::All
        }
    }
}

/// Builds the feed, printing an error on failure.
fn build_feed<S: BlockingCouponSource>(
    source: S,
    page_size: usize,
    category: Category,
) -> io::Result<Option<CouponFeedBlocking<S>>> {
    match CouponFeedBlocking::builder()
        .source(source)
        .page_size(page_size)
        .category(category)
        .build()
    {
        Ok(feed) => Ok(Some(feed)),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build feed: {err}",
                "error:".red().bold()
            )?;
            Ok(None)
        }
    }
}

/// Loads up to `pages` pages, stopping early once the feed is exhausted.
///
/// Returns the number of pages merged.
fn load_pages<S: BlockingCouponSource>(
    feed: &CouponFeedBlocking<S>,
    pages: usize,
) -> coupon_feed::error::Result<usize> {
    let mut loaded = 0_usize;
    while loaded < pages {
        match feed.load_next_page()? {
            PageLoad::Loaded { .. } => loaded += 1,
            PageLoad::Exhausted | PageLoad::InFlight | PageLoad::Stale => break,
        }
    }
    Ok(loaded)
}

/// Pages through the feed until `id` has been loaded.
///
/// Returns `false` if the feed ran out first.
fn load_until_found<S: BlockingCouponSource>(
    feed: &CouponFeedBlocking<S>,
    id: CouponId,
) -> coupon_feed::error::Result<bool> {
    loop {
        if feed.with_coupons(|coupons| coupons.iter().any(|coupon| coupon.id == id))? {
            return Ok(true);
        }
        match feed.load_next_page()? {
            PageLoad::Loaded { .. } => {}
            PageLoad::Exhausted | PageLoad::InFlight | PageLoad::Stale => return Ok(false),
        }
    }
}

/// Executes the `categories` subcommand.
fn cmd_categories() -> io::Result<ExitCode> {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Code").fg(Color::Cyan),
        Cell::new("Label").fg(Color::Cyan),
    ]);
    for category in Category::ALL {
        _ = table.add_row(vec![
            Cell::new(category),
            Cell::new(category.label()),
        ]);
    }

    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Categories".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `browse` subcommand: loads pages, prints the feed and
/// remembers the category.
fn cmd_browse<S: BlockingCouponSource, K: BlockingStore>(
    feed: &CouponFeedBlocking<S>,
    store: &K,
    pages: usize,
) -> io::Result<ExitCode> {
    let loaded = match load_pages(feed, pages) {
        Ok(loaded) => loaded,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to load coupons: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let (category, has_more, coupons) = match (feed.category(), feed.has_more(), feed.coupons()) {
        (Ok(category), Ok(has_more), Ok(coupons)) => (category, has_more, coupons),
        (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to read feed: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Err(err) = store.set(keys::LAST_CATEGORY, &category.to_string()) {
        tracing::warn!(error = %err, "could not remember category");
    }

    let title = format!("{} ({})", category.label(), category);
    print_coupons_table(&title, &coupons)?;
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{}",
        format_args!("{loaded} page(s) loaded").dimmed()
    )?;
    if has_more {
        writeln!(
            out,
            "{}",
            "More coupons available; pass --pages to load further.".dimmed()
        )?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `redeem` subcommand: finds the coupon, redeems it and
/// saves the catalog.
fn cmd_redeem(
    feed: &CouponFeedBlocking<CatalogSource>,
    id: CouponId,
    catalog_path: &Path,
) -> io::Result<ExitCode> {
    match load_until_found(feed, id) {
        Ok(true) => {}
        Ok(false) => {
            writeln!(
                io::stderr().lock(),
                "{} coupon {id} not found in this category",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to load coupons: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    }

    if let Err(err) = feed.redeem(id) {
        writeln!(io::stderr().lock(), "{} {err}", "error:".red().bold())?;
        return Ok(ExitCode::FAILURE);
    }

    if let Err(err) = feed.source().save(catalog_path) {
        writeln!(
            io::stderr().lock(),
            "{} coupon redeemed but catalog not saved: {err}",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }

    writeln!(
        io::stdout().lock(),
        "{} coupon {id}",
        "Redeemed".green().bold()
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `interleave` subcommand.
fn cmd_interleave(file: &Path, cadence: Cadence) -> io::Result<ExitCode> {
    let coupons = match read_coupons(file) {
        Ok(coupons) => coupons,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to read {}: {err}",
                "error:".red().bold(),
                file.display()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };
    print_coupons_table("Interleaved", &interleave(coupons, cadence))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads a JSON array of coupons.
fn read_coupons(file: &Path) -> coupon_feed::error::Result<Vec<Coupon>> {
    let contents = fs::read_to_string(file)
        .map_err(|err| coupon_feed::error::CouponFeedError::Storage(Box::new(err)))?;
    Ok(serde_json::from_str(&contents)?)
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints coupons in a table.
fn print_coupons_table(title: &str, coupons: &[Coupon]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if coupons.is_empty() {
        writeln!(out, "{}", "No coupons found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Merchant").fg(Color::Cyan),
        Cell::new("Coupon").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for coupon in coupons {
        let kind_cell = if coupon.is_promise {
            Cell::new("promise").fg(Color::Magenta)
        } else {
            Cell::new("regular").fg(Color::DarkGrey)
        };
        let status_cell = if coupon.is_used {
            Cell::new("used").fg(Color::DarkGrey)
        } else {
            Cell::new("available").fg(Color::Green)
        };
        _ = table.add_row(vec![
            Cell::new(coupon.id),
            Cell::new(&coupon.merchant_name),
            Cell::new(&coupon.title),
            kind_cell,
            status_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", coupons.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // stderr itself failed; nothing more to report.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use coupon_feed::source::CatalogEntry;
    use coupon_feed::storage::InMemoryStore;

    fn coupon(id: i64, merchant: &str, is_promise: bool) -> Coupon {
        Coupon {
            id: CouponId::new(id),
            merchant_name: merchant.to_owned(),
            title: format!("Coupon {id}"),
            detail: String::new(),
            image_ref: String::new(),
            is_used: false,
            is_promise,
        }
    }

    fn catalog() -> CatalogSource {
        CatalogSource::new(
            (1..=7)
                .map(|id| CatalogEntry {
                    category: if id % 2 == 0 { Category::Korean } else { Category::Etc },
                    coupon: coupon(id, "Shop", id == 3),
                })
                .collect(),
        )
    }

    fn feed(page_size: usize, category: Category) -> CouponFeedBlocking<CatalogSource> {
        build_feed(catalog(), page_size, category).unwrap().unwrap()
    }

    #[test]
    fn cli_parses_browse() {
        let cli = Cli::try_parse_from([
            "coupons", "--catalog", "c.json", "browse", "--category", "한식", "--pages", "3",
        ])
        .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("c.json")));
        assert!(matches!(
            cli.command,
            Command::Browse(BrowseArgs {
                category: Some(Category::Korean),
                pages: 3,
            })
        ));
    }

    #[test]
    fn cli_rejects_unknown_category() {
        let result = Cli::try_parse_from(["coupons", "browse", "--category", "PIZZA"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_cadence_rejects_zero() {
        assert!(parse_cadence("0").is_err());
        assert_eq!(parse_cadence("3").unwrap().get(), 3);
    }

    #[test]
    fn catalog_flag_wins_over_env() {
        let path = resolve_catalog(
            Some(PathBuf::from("flag.json")),
            Some(OsString::from("env.json")),
        );
        assert_eq!(path, Some(PathBuf::from("flag.json")));
        let from_env = resolve_catalog(None, Some(OsString::from("env.json")));
        assert_eq!(from_env, Some(PathBuf::from("env.json")));
        assert_eq!(resolve_catalog(None, Some(OsString::new())), None);
    }

    #[test]
    fn page_size_resolution() {
        assert_eq!(resolve_page_size(Some(4), Some("7")).unwrap(), 4);
        assert_eq!(resolve_page_size(None, Some(" 7 ")).unwrap(), 7);
        assert_eq!(resolve_page_size(None, None).unwrap(), DEFAULT_PAGE_SIZE);
        assert!(resolve_page_size(None, Some("lots")).is_err());
    }

    #[test]
    fn create_store_with_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_store(Some(dir.path().to_path_buf()));
        assert!(store.is_ok());
    }

    #[test]
    fn remembered_category_defaults_to_all() {
        let store = InMemoryStore::new();
        assert_eq!(remembered_category(&store), Category::All);
        store.set(keys::LAST_CATEGORY, "JAPANESE").unwrap();
        assert_eq!(remembered_category(&store), Category::Japanese);
        store.set(keys::LAST_CATEGORY, "garbage").unwrap();
        assert_eq!(remembered_category(&store), Category::All);
    }

    #[test]
    fn build_feed_rejects_zero_page_size() {
        assert!(build_feed(catalog(), 0, Category::All).unwrap().is_none());
    }

    #[test]
    fn load_pages_stops_when_exhausted() {
        let feed = feed(3, Category::All);
        assert_eq!(load_pages(&feed, 10).unwrap(), 3);
        assert_eq!(feed.coupons().unwrap().len(), 7);
        assert!(!feed.has_more().unwrap());
    }

    #[test]
    fn load_until_found_pages_forward() {
        let feed = feed(2, Category::All);
        assert!(load_until_found(&feed, CouponId::new(5)).unwrap());
        assert_eq!(feed.coupons().unwrap().len(), 6);
        assert!(!load_until_found(&feed, CouponId::new(42)).unwrap());
    }

    #[test]
    fn browse_remembers_category() {
        let feed = feed(10, Category::Korean);
        let store = InMemoryStore::new();
        let code = cmd_browse(&feed, &store, 1).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(
            store.get(keys::LAST_CATEGORY).unwrap().as_deref(),
            Some("KOREAN")
        );
    }

    #[test]
    fn redeem_saves_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let feed = feed(2, Category::All);
        let code = cmd_redeem(&feed, CouponId::new(6), &path).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let saved = CatalogSource::from_path(&path).unwrap();
        let used: Vec<i64> = saved
            .entries()
            .unwrap()
            .into_iter()
            .filter(|entry| entry.coupon.is_used)
            .map(|entry| entry.coupon.id.into_inner())
            .collect();
        assert_eq!(used, vec![6]);

        let again = cmd_redeem(&feed, CouponId::new(6), &path).unwrap();
        assert_eq!(again, ExitCode::FAILURE);
    }

    #[test]
    fn interleave_reads_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        catalog().save(&path).unwrap();
        let coupons = read_coupons(&path).unwrap();
        assert_eq!(coupons.len(), 7);
        assert_eq!(cmd_interleave(&path, Cadence::DEFAULT).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn interleave_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let code = cmd_interleave(&dir.path().join("missing.json"), Cadence::DEFAULT).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn print_coupons_table_empty() {
        assert!(print_coupons_table("Empty", &[]).is_ok());
    }
}
