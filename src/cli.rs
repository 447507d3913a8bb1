use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mhtshelf_core::filter::FilterMode;
use mhtshelf_core::sort::SortOrder;

#[derive(Parser)]
#[command(name = "mhtshelf")]
#[command(about = "Manage a folder library of saved MHTML pages", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Library directory (overrides `library.base_dir` from the config)
    #[arg(long, global = true)]
    pub(crate) base: Option<PathBuf>,

    /// More logging; repeat for debug output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List archived pages.
    List {
        /// name, time_asc or time_desc. Defaults to the saved preference.
        #[arg(long)]
        sort: Option<SortOrder>,
        /// Only show entries whose title matches
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Output JSON rows
        #[arg(long)]
        json: bool,
    },

    /// Print the open request for an entry.
    Open {
        id: String,
        /// Allow navigation and editing in the viewer
        #[arg(long)]
        editable: bool,
    },

    /// Rename an entry's folder and archive.
    Rename { id: String, name: String },

    /// Delete one or more entries. External originals are never touched.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Add a file to the library, by reference when it is already MHTML.
    Import { path: PathBuf },

    /// Store an archive produced by an external renderer for `url`.
    Capture {
        url: String,
        /// MHTML file written by the renderer
        #[arg(long)]
        archive: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },

    /// Save the default sort order.
    Sort { order: SortOrder },

    /// Save the translation target language (`auto` resets it).
    Language { tag: String },

    /// Print the config file location.
    ConfigPath,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(crate) enum ModeArg {
    Prefix,
    Substring,
    Fuzzy,
}

impl From<ModeArg> for FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Prefix => FilterMode::Prefix,
            ModeArg::Substring => FilterMode::Substring,
            ModeArg::Fuzzy => FilterMode::Fuzzy,
        }
    }
}
