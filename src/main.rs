use clap::{Parser, Subcommand};
use env_logger::Env;
use sitepath::document::ReadPolicy;
use sitepath::plugins::{self, CapabilityRegistry};
use sitepath::site::{ReadStats, Site};
use sitepath::{config, generate, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sitepath")]
#[command(about = "URL routing for Jekyll-style static sites")]
#[command(long_about = "\
URL routing for Jekyll-style static sites

Reads a site directory, resolves each document's front matter through the
`defaults` cascade, compiles its permalink, and checks that no two files
claim the same URL.

Site structure:

  site/
  ├── _config.yml                     # Site config (optional)
  ├── about.md                        # Page → /about.html
  ├── css/site.css                    # Static file → /css/site.css
  ├── _posts/
  │   └── 2006-02-03-base.md          # Post → /2006/02/03/base.html
  ├── _drafts/
  │   └── idea.md                     # Draft (read with --drafts)
  ├── _recipes/                       # Collection (declared in _config.yml)
  │   └── cake.md                     # → /recipes/cake.html
  └── _site/                          # Destination (never read)

Permalink resolution (first available wins):
  Pattern:  front matter `permalink` → `defaults` → collection default
  Date:     front matter `date` → YYYY-MM-DD- filename prefix → mtime

Run 'sitepath gen-config' to generate a documented _config.yml.")]
#[command(version)]
struct Cli {
    /// Site directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory (overrides `destination` in the config)
    #[arg(long, global = true)]
    destination: Option<PathBuf>,

    /// Publish documents with `published: false`
    #[arg(long, global = true)]
    unpublished: bool,

    /// Read `_drafts/`
    #[arg(long, global = true)]
    drafts: bool,

    /// Publish documents dated in the future
    #[arg(long, global = true)]
    future: bool,

    /// Worker threads for reading (default: all cores)
    #[arg(long, short = 'j', global = true)]
    jobs: Option<usize>,

    /// Skip files with malformed front matter instead of aborting
    #[arg(long, global = true)]
    skip_invalid: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every URL and the file it comes from
    Routes,
    /// Read the site and report problems without writing anything
    Check,
    /// Read the site and write it to the destination
    Build,
    /// Print a stock _config.yml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Routes => {
            let (site, stats) = read_site(&cli)?;
            output::print_routes_output(&site, &stats);
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let (site, stats) = read_site(&cli)?;
            let mut registry = CapabilityRegistry::new();
            let installed = plugins::install(&site.config().plugins, &mut registry)?;
            output::print_capabilities(&installed, &registry.freeze());
            println!("{}", output::format_read_summary(&stats, site.registry().len()));
            println!("==> Site is valid");
        }
        Command::Build => {
            println!("==> Stage 1: Reading {}", cli.source.display());
            let (site, stats) = read_site(&cli)?;
            println!("{}", output::format_read_summary(&stats, site.registry().len()));

            let mut registry = CapabilityRegistry::new();
            plugins::install(&site.config().plugins, &mut registry)?;
            let capabilities = registry.freeze();

            println!("==> Stage 2: Writing → {}", site.destination().display());
            let summary = generate::generate(&site, &capabilities)?;
            output::print_generate_output(&summary);

            println!("==> Build complete: {}", site.destination().display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_yaml());
        }
    }

    Ok(())
}

/// Load, configure, and read the site named by the CLI flags.
fn read_site(cli: &Cli) -> Result<(Site, ReadStats), Box<dyn std::error::Error>> {
    init_thread_pool(cli.jobs);
    let flags = config::Flags {
        destination: cli
            .destination
            .as_deref()
            .map(absolute)
            .transpose()?
            .map(|p| p.to_string_lossy().into_owned()),
        unpublished: cli.unpublished.then_some(true),
        drafts: cli.drafts.then_some(true),
        future: cli.future.then_some(true),
    };
    let mut site = Site::from_directory(&cli.source, &flags)?;
    if let Some(file) = site.config_file() {
        log::info!("using config {}", file.display());
    }
    let policy = if cli.skip_invalid {
        ReadPolicy::SkipInvalid
    } else {
        ReadPolicy::FailFast
    };
    let stats = site.read_files(policy)?;
    Ok((site, stats))
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores; `--jobs` can constrain down, not up.
fn init_thread_pool(jobs: Option<usize>) {
    let threads = config::effective_threads(jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// A `--destination` is relative to the working directory, not the source.
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
