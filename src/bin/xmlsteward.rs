//! Command-line driver for xmlsteward documents.
//!
//! Parses each input, optionally parses fragments into it, unlinks nodes
//! matched by a path, and prints what teardown released.

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xmlsteward::{Document, DocumentConfig, ParseOptions, TeardownReport};

const EXIT_SUCCESS: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_USAGE_ERROR: u8 = 2;

/// xmlsteward -- parse XML files and report their node lifecycle.
#[derive(Parser, Debug)]
#[command(name = "xmlsteward", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// XML files to process (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// Fail on malformed input instead of recovering.
    #[arg(long)]
    strict: bool,

    /// Log parser errors (suppressed by default).
    #[arg(long)]
    errors: bool,

    /// Log parser warnings (suppressed by default).
    #[arg(long)]
    warnings: bool,

    /// Label of the input encoding.
    #[arg(long, value_name = "ENCODING", default_value = "utf-8")]
    encoding: String,

    /// Maximum number of live nodes per document.
    #[arg(long, value_name = "N")]
    max_nodes: Option<u32>,

    /// Parse this XML snippet into each document as a fragment (repeatable).
    #[arg(long, value_name = "XML")]
    fragment: Vec<String>,

    /// Remove fragments before teardown instead of during it.
    #[arg(long)]
    remove_fragments: bool,

    /// Unlink every node matched by this location path.
    #[arg(long, value_name = "PATH")]
    unlink: Option<String>,

    /// Print the diagnostics collected while parsing.
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> ParseOptions {
        ParseOptions::NONET
            .recover(!self.strict)
            .no_error(!self.errors)
            .no_warning(!self.warnings)
    }

    fn config(&self, url: &str) -> DocumentConfig {
        let mut config = DocumentConfig::default()
            .input_encoding(self.encoding.clone())
            .url(url)
            .options(self.options());
        if let Some(limit) = self.max_nodes {
            config = config.node_limit(limit);
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut worst_exit = EXIT_SUCCESS;
    for file in &cli.files {
        worst_exit = worst_exit.max(process_file(&cli, file));
    }
    ExitCode::from(worst_exit)
}

fn process_file(cli: &Cli, filename: &str) -> u8 {
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_PARSE_ERROR;
        }
    };

    let mut doc = match Document::parse(&input, &cli.config(filename)) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return EXIT_PARSE_ERROR;
        }
    };

    let mut exit = EXIT_SUCCESS;
    for (i, snippet) in cli.fragment.iter().enumerate() {
        let url = format!("{filename}#fragment{i}");
        match doc.parse_fragment(snippet.as_bytes(), &url, cli.options()) {
            Ok(id) if cli.remove_fragments => {
                doc.remove_fragment(id);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{url}: {e}");
                exit = EXIT_PARSE_ERROR;
            }
        }
    }

    if let Some(path) = &cli.unlink {
        match doc.search(&doc.root(), path) {
            Ok(hits) => {
                for node in hits {
                    if let Err(e) = doc.unlink(&node) {
                        eprintln!("{filename}: cannot unlink: {e}");
                    }
                }
            }
            Err(e) => {
                eprintln!("{filename}: {e}");
                exit = EXIT_USAGE_ERROR;
            }
        }
    }

    if cli.verbose {
        for diag in doc.diagnostics() {
            eprintln!("{filename}: {diag}");
        }
    }

    let root = doc.root().name(&doc).unwrap_or("(none)").to_string();
    let report = doc.free();
    print_report(filename, &root, &report);
    exit
}

fn print_report(filename: &str, root: &str, report: &TeardownReport) {
    println!("{filename}: root <{root}>");
    println!("  fragments removed:   {}", report.fragments_removed);
    println!("  nodes migrated:      {}", report.migrated);
    println!("  unlinked freed:      {}", report.freed_nodes.len());
    println!("  stale skipped:       {}", report.stale_skipped.len());
    println!("  tree nodes released: {}", report.tree_nodes_released);
}

fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}
