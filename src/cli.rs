use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "artbook")]
#[command(author, version, about = "Art-book metadata lens for catalog product pages", long_about = None)]
#[command(after_help = r#"Examples:
  artbook inspect https://www.suruga-ya.com/en/product/123456   Extract a product page
  artbook inspect page.html --url https://www.suruga-ya.com/en/product/123456
  artbook show https://www.suruga-ya.com/en/product/123456      Full panel view
  artbook title "Anime and manga books THE ART OF FOO BAR"      Normalize a title
  artbook price "Used 5,106JPY"                                 Parse a yen price
  artbook history list                                          Recently viewed
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the product record from a page
    Inspect {
        /// Product page URL or saved HTML file
        source: String,

        /// Location to assume when SOURCE is a file
        #[arg(long)]
        url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a page the way the panel would (page count, FX, links, history)
    Show {
        /// Product page URL or saved HTML file
        source: String,

        /// Location to assume when SOURCE is a file
        #[arg(long)]
        url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize a raw catalog title
    Title {
        /// Raw title text
        raw: String,
    },

    /// Parse a price from free text
    Price {
        /// Text containing a price (e.g. "5,106JPY" or "€ 1.234,56")
        text: String,

        /// Parse as a euro amount instead of yen
        #[arg(long)]
        euro: bool,
    },

    /// Look up a page count in the public book catalogs
    Pages {
        /// Book title
        #[arg(long)]
        title: String,

        /// Author name
        #[arg(long)]
        author: Option<String>,

        /// Publisher or maker
        #[arg(long)]
        maker: Option<String>,
    },

    /// Manage the search history
    #[command(subcommand)]
    History(HistoryCommands),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List entries, newest first
    List {
        /// Max entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove one entry by product URL
    Remove {
        url: String,
    },

    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Print config file and database locations
    Path,
}
