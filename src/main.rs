use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use namesake::config::DEFAULT_CONFIG_FILE;
use namesake::view::AliasListing;
use namesake::{locate_in_document, DuplicateReport, Engine, Error, Origin, Settings, VaultStore};

/// namesake - Find notes in a markdown vault that share a name or alias
#[derive(Parser)]
#[command(name = "namesake")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log index activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a vault and list aliases shared by more than one entry
    Dupes {
        /// Vault root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the aliases of one document and what they normalize to
    List {
        /// Markdown file
        file: PathBuf,

        /// Vault root the file belongs to
        #[arg(long, default_value = ".")]
        vault: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find where an alias is written in a document's frontmatter
    Locate {
        /// Markdown file
        file: PathBuf,

        /// Raw alias to look for
        alias: String,

        /// Which occurrence to select (1-based)
        #[arg(short = 'n', long, default_value = "1")]
        occurrence: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep the duplicate report live while the vault changes
    Watch {
        /// Vault root
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Dupes { path, json } => cmd_dupes(&path, json, &cli.config, cli.quiet),
        Commands::List { file, vault, json } => cmd_list(&file, &vault, json, &cli.config),
        Commands::Locate { file, alias, occurrence, json } => cmd_locate(&file, &alias, occurrence, json),
        Commands::Watch { path } => cmd_watch(&path, &cli.config, cli.quiet),
        Commands::Init { force } => cmd_init(&cli.config, force),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("NAMESAKE_LOG")
            .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "warn" }))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_dupes(path: &Path, json: bool, config: &Path, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(config)?;
    let store = VaultStore::open(path)?;
    let start = Instant::now();

    let mut engine = Engine::new(settings);
    engine.open_duplicate_view(&store);
    let Some(report) = engine.duplicate_report() else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    if !quiet {
        let documents = engine.duplicate_index().map_or(0, |index| index.document_count());
        eprintln!("\nIndexed {} documents in {:?}", documents, start.elapsed());
    }
    Ok(())
}

fn cmd_list(file: &Path, vault: &Path, json: bool, config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(config)?;
    let store = VaultStore::open(vault)?;
    let absolute = fs::canonicalize(file).map_err(|e| Error::Io {
        path: file.to_path_buf(),
        source: e,
    })?;
    let id = store
        .id_for_path(&absolute)
        .ok_or_else(|| Error::DocumentNotFound(file.display().to_string()))?;

    let mut engine = Engine::new(settings);
    engine.open_list_view(Some(id.clone()), &store);

    match engine.listing() {
        Some(listing) if json => println!("{}", serde_json::to_string_pretty(listing)?),
        Some(listing) => print_listing(listing),
        None if json => println!("null"),
        None => println!("{}", format!("No aliases for {}.", id).dimmed()),
    }
    Ok(())
}

fn cmd_locate(file: &Path, alias: &str, occurrence: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file).map_err(|e| Error::Io {
        path: file.to_path_buf(),
        source: e,
    })?;
    let selection = locate_in_document(&content, alias, occurrence.max(1));

    if json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
        return Ok(());
    }

    match selection {
        Some(sel) => println!(
            "{}:{}-{}:{}",
            sel.from.line + 1,
            sel.from.column + 1,
            sel.to.line + 1,
            sel.to.column + 1
        ),
        None => println!("{}", format!("'{}' not found in frontmatter.", alias).yellow()),
    }
    Ok(())
}

fn cmd_watch(path: &Path, config: &Path, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(config)?;
    let store = VaultStore::open(path)?;

    let mut engine = Engine::new(settings);
    engine.open_duplicate_view(&store);
    if let Some(report) = engine.duplicate_report() {
        print_report(&report);
    }
    if !quiet {
        eprintln!("\n{}", format!("Watching {} (Ctrl-C to stop)", store.root().display()).dimmed());
    }

    namesake::watch::watch_vault(&mut engine, &store, |engine| {
        if let Some(report) = engine.duplicate_report() {
            println!("\n{}", "-".repeat(40).dimmed());
            print_report(&report);
        }
    })?;
    Ok(())
}

fn cmd_init(config: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    Settings::write_default(config, force)?;
    println!("{} {}", "Wrote".green(), config.display());
    Ok(())
}

fn print_report(report: &DuplicateReport) {
    if report.is_empty() {
        println!("{}", "No duplicate aliases found.".green());
        return;
    }

    let text = report.summary.text();
    let title = report.summary.title();
    let detail = title.strip_prefix(text.as_str()).unwrap_or_default();
    println!("{}{}", text.yellow().bold(), detail.dimmed());

    for group in &report.groups {
        println!("\n{} {}", group.label.cyan().bold(), format!("({})", group.entries.len()).dimmed());
        for entry in &group.entries {
            let marker = match entry.origin {
                Origin::FromName => "*".green(),
                Origin::FromAlias => "~".dimmed(),
            };
            let occurrence = if entry.occurrence > 1 {
                format!(" #{}", entry.occurrence)
            } else {
                String::new()
            };
            println!(
                "  {} {} {}{}",
                marker,
                entry.raw_alias,
                entry.title().dimmed(),
                occurrence.dimmed()
            );
        }
    }
}

fn print_listing(listing: &AliasListing) {
    println!("{}", listing.document_id.to_string().cyan().bold());
    for alias in &listing.aliases {
        let occurrence = alias.occurrence.map(|n| format!(" #{}", n)).unwrap_or_default();
        println!("  {}{}", alias.title(), occurrence.dimmed());
        for generated in &alias.generated {
            println!("    {} {}", "-".dimmed(), generated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use namesake::DocumentStore;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_locate_defaults() {
        let cli = Cli::try_parse_from(["namesake", "locate", "Note.md", "Alias"]).unwrap();
        match cli.command {
            Commands::Locate { occurrence, json, .. } => {
                assert_eq!(occurrence, 1);
                assert!(!json);
            }
            _ => panic!("expected locate"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_dupes_on_vault() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A.md"), "---\naliases: [Shared]\n---\n").unwrap();
        fs::write(dir.path().join("B.md"), "---\naliases: [shared]\n---\n").unwrap();

        let store = VaultStore::open(dir.path()).unwrap();
        assert_eq!(store.documents().len(), 2);

        let config = dir.path().join("missing.toml");
        assert!(cmd_dupes(dir.path(), true, &config, true).is_ok());
    }
}
