use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing::{info, warn};

use crate::config::{Language, SearchConfig};
use crate::criteria::{PageCriteria, SearchCriteria, SetComplement};
use crate::cursor::FileCursorStore;
use crate::data::EntityType;
use crate::search::WikiDumpSearcher;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntityTypeArg {
    Item,
    Property,
}

impl From<EntityTypeArg> for EntityType {
    fn from(value: EntityTypeArg) -> Self {
        match value {
            EntityTypeArg::Item => EntityType::Item,
            EntityTypeArg::Property => EntityType::Property,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "search_dump",
    disable_help_subcommand = true,
    about = "Filtered, paginated search over a Wikidata-style JSON dump",
    long_about = "Stream a dump, keep entities matching the filters, and print one page of them as JSON lines.",
    after_help = "Logs go to stderr and honour RUST_LOG. With --cursor-store, a later run can resume the next page without rescanning from the start."
)]
struct SearchCli {
    #[arg(long, value_name = "PATH", help = "Dump file (.json, or .json.zst)")]
    dump: PathBuf,
    #[arg(
        long = "type",
        value_enum,
        value_name = "TYPE",
        help = "Entity type filter, repeat as needed"
    )]
    types: Vec<EntityTypeArg>,
    #[arg(
        long = "exclude-types",
        help = "Treat --type values as types to reject instead of types to keep"
    )]
    exclude_types: bool,
    #[arg(long, value_name = "ID", help = "Exact entity id")]
    id: Option<String>,
    #[arg(
        long = "label-contains",
        value_name = "TEXT",
        help = "Required label substring, repeat as needed"
    )]
    label_contains: Vec<String>,
    #[arg(
        long = "description-contains",
        value_name = "TEXT",
        help = "Required description substring, repeat as needed"
    )]
    description_contains: Vec<String>,
    #[arg(
        long,
        default_value = "en",
        help = "Language code used for labels and descriptions"
    )]
    language: String,
    #[arg(long = "page-index", default_value_t = 0, help = "Zero-based page index")]
    page_index: u64,
    #[arg(long = "page-size", default_value_t = 10, help = "Entities per page")]
    page_size: u64,
    #[arg(
        long = "cursor-store",
        value_name = "PATH",
        help = "File (or directory) for persisted cursors"
    )]
    cursor_store: Option<PathBuf>,
    #[arg(
        long,
        help = "Keep requesting pages from --page-index until the filtered sequence ends"
    )]
    all: bool,
}

impl SearchCli {
    fn criteria(&self) -> SearchCriteria {
        let mut builder = SearchCriteria::builder().language(Language::new(self.language.clone()));
        if !self.types.is_empty() || self.exclude_types {
            let complement = if self.exclude_types {
                SetComplement::Exclusive
            } else {
                SetComplement::Inclusive
            };
            builder = builder.entity_types(
                complement,
                self.types.iter().copied().map(EntityType::from),
            );
        }
        if let Some(id) = &self.id {
            builder = builder.id(id.clone());
        }
        for part in &self.label_contains {
            builder = builder.label_contains(part.clone());
        }
        for part in &self.description_contains {
            builder = builder.description_contains(part.clone());
        }
        builder.build()
    }
}

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wikidump_search=info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

/// Run the search CLI, printing matching entities to stdout as JSON lines.
pub fn run_search_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_logging();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_search_cli_with_output(args_iter, &mut out)
}

/// Like [`run_search_cli`], writing JSON lines to `out` and leaving logging alone.
pub fn run_search_cli_with_output<I, W>(args_iter: I, out: &mut W) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
    W: Write,
{
    let Some(cli) = parse_cli::<SearchCli, _>(
        std::iter::once("search_dump".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let criteria = cli.criteria();
    let mut page = PageCriteria::new(cli.page_index, cli.page_size)?;
    let mut searcher = WikiDumpSearcher::new(SearchConfig::new(cli.dump.clone()))?;
    if let Some(path) = &cli.cursor_store {
        match FileCursorStore::open(path.clone()) {
            Ok(store) => searcher = searcher.with_cursor_store(Arc::new(store)),
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "[wikidump:cli] cursor store unavailable; searching without persisted cursors"
            ),
        }
    }

    let mut printed = 0usize;
    loop {
        let entities = searcher.search(&criteria, &page)?;
        let exhausted = (entities.len() as u64) < page.page_size();
        for entity in &entities {
            writeln!(out, "{}", serde_json::to_string(entity)?)?;
        }
        printed += entities.len();
        if !cli.all || exhausted {
            break;
        }
        page = page.next()?;
    }
    out.flush()?;

    info!(
        dump = %cli.dump.display(),
        printed,
        last_page = page.page_index(),
        "[wikidump:cli] search finished"
    );
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
