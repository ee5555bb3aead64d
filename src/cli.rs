//! Command line surface and the search action

use std::io::IsTerminal;

use clap::Parser;

use crate::config::{DEFAULT_FIND_LIMIT, DEFAULT_LAZAMAR_CHANNEL};
use crate::output::{self, ShowMode};
use crate::search::{
    SearchOptions, Searcher, ensure_one_selected, ensure_unique_package_names,
};
use crate::spec::parser::DefaultBackend;
use crate::spec::{FileReaders, files, parse_search_specs};

#[derive(Parser)]
#[command(name = "nix-versions")]
#[command(version, about = "Search nix package versions across version-history backends")]
pub struct Cli {
    /// Package specs: `emacs@~25`, `nixhub:go`, `lazamar:nixos-24.05:go`,
    /// `bin/pwd`, `system:coreutils`, `github:org/repo#pkg`, ...
    pub specs: Vec<String>,

    /// Read specs from a tools file; `-` reads stdin
    #[arg(long, short = 'r', value_name = "FILE")]
    pub read: Vec<String>,

    /// Use nixhub.io for specs without a backend (the default)
    #[arg(long, short = 'n')]
    pub nixhub: bool,

    /// Use history.nix-packages.com for specs without a backend
    #[arg(long)]
    pub history: bool,

    /// Use lazamar.co.uk for specs without a backend
    #[arg(long, short = 'l')]
    pub lazamar: bool,

    /// Nixpkgs channel for lazamar searches; implies --lazamar
    #[arg(long, short = 'c', value_name = "CHANNEL")]
    pub channel: Option<String>,

    /// Render a table (the default)
    #[arg(long, short = 't')]
    pub text: bool,

    /// Render a JSON tool manifest
    #[arg(long, short = 'j')]
    pub json: bool,

    /// Render one installable reference per line
    #[arg(long, short = 'i')]
    pub installable: bool,

    /// Render a generated flake.nix
    #[arg(long, short = 'f')]
    pub flake: bool,

    /// Show all versions, not just the constrained ones
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Show only the selected version per package
    #[arg(long, short = '1')]
    pub one: bool,

    /// Keep only versions whose attribute equals the query
    #[arg(long)]
    pub exact: bool,

    /// Version constraint for specs that carry none
    #[arg(long, value_name = "CONSTRAINT")]
    pub constraint: Option<String>,

    /// Keep the last N versions (first N when negative)
    #[arg(long, default_value_t = 0, value_name = "N", allow_hyphen_values = true)]
    pub limit: i64,

    /// Keep versions in the order the backend reported
    #[arg(long)]
    pub no_sort: bool,

    /// Newest first instead of oldest first
    #[arg(long)]
    pub reverse: bool,

    /// Fail unless every package resolves to exactly one version
    #[arg(long)]
    pub assert_one: bool,

    /// Force colorized output
    #[arg(long)]
    pub color: bool,

    /// Disable colorized output
    #[arg(long, conflicts_with = "color")]
    pub no_color: bool,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<String>,
}

impl Cli {
    fn default_backend(&self) -> DefaultBackend {
        if let Some(channel) = &self.channel {
            return DefaultBackend::Lazamar {
                channel: channel.clone(),
            };
        }
        if self.lazamar {
            return DefaultBackend::Lazamar {
                channel: DEFAULT_LAZAMAR_CHANNEL.to_string(),
            };
        }
        if self.history {
            return DefaultBackend::History;
        }
        DefaultBackend::NixHub
    }

    fn show_mode(&self) -> ShowMode {
        if self.all {
            ShowMode::All
        } else if self.one {
            ShowMode::One
        } else {
            ShowMode::Constrained
        }
    }

    fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        self.color || std::io::stdout().is_terminal()
    }

    fn search_options(&self) -> SearchOptions {
        // widen program lookups along with an explicit --limit
        let find_limit = if self.limit == 0 {
            DEFAULT_FIND_LIMIT
        } else {
            (self.limit.unsigned_abs() as usize).max(DEFAULT_FIND_LIMIT)
        };
        SearchOptions {
            exact: self.exact,
            default_constraint: self.constraint.clone(),
            limit: self.limit,
            sort: !self.no_sort,
            find_limit,
        }
    }
}

/// Parse specs, run the concurrent search and render the requested output.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let readers = FileReaders::default();

    let mut tokens = Vec::new();
    for file in &cli.read {
        tokens.extend(files::read_specs(file)?);
    }
    for token in &cli.specs {
        tokens.extend(files::expand_token(token, &readers)?);
    }
    if tokens.is_empty() {
        anyhow::bail!("no package specs given, see --help for the spec syntax");
    }

    let specs = parse_search_specs(&tokens, &cli.default_backend()).await?;
    let searcher = Searcher::new(cli.search_options());
    let results = searcher.search_specs(specs).await?;

    if cli.assert_one {
        ensure_one_selected(&results)?;
        ensure_unique_package_names(&results)?;
    }

    let rendered = if cli.json {
        output::json(&results)?
    } else if cli.installable {
        output::installables(&results)?
    } else if cli.flake {
        output::flake(&results)?
    } else {
        output::text(&results, cli.show_mode(), cli.use_color(), cli.reverse)
    };

    match cli.out.as_deref() {
        Some(path) if path != "-" => std::fs::write(path, rendered)?,
        _ => println!("{rendered}"),
    }
    Ok(())
}
