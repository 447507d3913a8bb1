mod cli;
mod logging;

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{debug, info};

use mhtshelf_core::config::Config;
use mhtshelf_core::filter::filter_entries;
use mhtshelf_core::import::FileSource;
use mhtshelf_core::library::OpenRequest;
use mhtshelf_core::list::{LibraryList, ListEvents};
use mhtshelf_core::prefs::Prefs;
use mhtshelf_core::selection::SelectionListener;
use mhtshelf_core::sort::SortOrder;
use mhtshelf_core::{CollaboratorError, Library, LibraryEntry};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    logging::init_logging(&config.logging.level, cli.verbose)?;

    let mut prefs = Prefs::load();
    let base = cli.base.clone().unwrap_or_else(|| config.library.base_path());
    let library = Library::new(base);
    debug!(base = %library.base().display(), "library opened");

    match cli.command {
        Command::List {
            sort,
            filter,
            mode,
            json,
        } => {
            let sort = sort.unwrap_or_else(|| prefs.sort_or(config.library.default_sort));
            let mode = mode.map(Into::into).unwrap_or(config.library.filter_mode);
            let mut entries = library.scan();
            if let Some(query) = filter.as_deref() {
                entries = filter_entries(&entries, query, mode);
            }
            let mut list = LibraryList::new(sort);
            list.reload(entries);
            print_list(&list, json)?;
        }
        Command::Open { id, editable } => {
            let mut list = load_list(&library, SortOrder::default());
            let index = index_of(&list, &id)?;
            let mut opener = Opener {
                library: &library,
                read_only: !editable,
                request: None,
            };
            list.tap(index, &mut opener);
            let request = opener
                .request
                .with_context(|| format!("no entry {id}"))??;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Command::Rename { id, name } => {
            let entry = library
                .find(&id)
                .with_context(|| format!("no entry {id}"))?;
            let renamed = library.rename(&entry, &name)?;
            println!("{} -> {}", entry.folder_id, renamed.folder_id);
        }
        Command::Delete { ids } => {
            let mut list = load_list(&library, SortOrder::default());
            list.set_selection_listener(Box::new(SelectionLog));
            let mut missing = Vec::new();
            for id in &ids {
                if list.selection().entries().iter().any(|e| &e.folder_id == id) {
                    list.selection_mut().select_by_id(id, true);
                } else {
                    missing.push(id.clone());
                }
            }
            let report = library.delete(&list.selection().selected_entries());
            for id in &report.deleted {
                println!("deleted {id}");
            }
            if !missing.is_empty() {
                bail!("no such entries: {}", missing.join(", "));
            }
            if !report.all_succeeded() {
                bail!("{}", report.summary());
            }
        }
        Command::Import { path } => {
            let source = FileSource::new(&path);
            let outcome = library.import(&source, &config.import.native_extensions)?;
            let how = if outcome.copied { "copied" } else { "linked" };
            println!("{how} {} as {}", path.display(), outcome.entry.folder_id);
        }
        Command::Capture {
            url,
            archive,
            title,
        } => {
            let pending = library.prepare_capture(&url, title.as_deref().unwrap_or_default())?;
            let rendered = copy_archive(&archive, pending.archive_path());
            let entry = pending.finish(rendered)?;
            println!("captured {} as {}", url, entry.folder_id);
        }
        Command::Sort { order } => {
            prefs.sort = Some(order);
            prefs.save().context("could not save preferences")?;
            info!(%order, "default sort saved");
            println!("{order}");
        }
        Command::Language { tag } => {
            let tag = tag.trim().to_lowercase();
            prefs.target_language = if tag.is_empty() || tag == "auto" {
                None
            } else {
                Some(tag)
            };
            prefs.save().context("could not save preferences")?;
            println!(
                "{}",
                prefs.target_language_or(&config.overlay.target_language)
            );
        }
        Command::ConfigPath => {
            let path = Config::config_path().context("no config directory on this system")?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

struct Opener<'a> {
    library: &'a Library,
    read_only: bool,
    request: Option<mhtshelf_core::Result<OpenRequest>>,
}

impl ListEvents for Opener<'_> {
    fn on_open(&mut self, entry: &LibraryEntry) {
        self.request = Some(self.library.open(entry, self.read_only));
    }
}

struct SelectionLog;

impl SelectionListener for SelectionLog {
    fn on_selection_changed(&mut self, count: usize) {
        debug!(count, "selection changed");
    }
}

fn load_list(library: &Library, sort: SortOrder) -> LibraryList {
    let mut list = LibraryList::new(sort);
    list.reload(library.scan());
    list
}

fn index_of(list: &LibraryList, id: &str) -> anyhow::Result<usize> {
    (0..list.len())
        .find(|&i| list.entry(i).is_some_and(|e| e.folder_id == id))
        .with_context(|| format!("no entry {id}"))
}

fn print_list(list: &LibraryList, json: bool) -> anyhow::Result<()> {
    let rows = list.rows();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in rows {
        let marker = if row.external { "*" } else { " " };
        println!("{marker} {:<32} {}  {}", row.folder_id, row.subtitle, row.title);
    }
    Ok(())
}

/// Stands in for the page renderer: the archive is already on disk.
fn copy_archive(from: &Path, to: &Path) -> Result<(), CollaboratorError> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| CollaboratorError::new(format!("{}: {e}", from.display())))
}
