mod db;
mod layout;
mod parser;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use layout::LayoutConfig;
use parser::boundary::{self, BoundaryConfig};
use parser::{BlockOutcome, ProcessedBlock};

#[derive(Parser)]
#[command(name = "spellbook", about = "Rulebook OCR to structured spell records")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = db::DB_PATH)]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild reading order for OCR page results and write one .txt per page
    Order {
        /// OCR result JSON files (one page each)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory for page text
        #[arg(short, long, default_value = "data/pages")]
        out_dir: PathBuf,
        /// Gap between left edges that starts a new column
        #[arg(long, default_value = "50")]
        gap: f64,
    },
    /// Split a text file into spell blocks, parse them and store the results
    Parse {
        /// Text file with delimiter-separated spell blocks
        file: PathBuf,
        /// Only split at delimiters that close a plausible spell block
        #[arg(long)]
        detect: bool,
        /// Block delimiter
        #[arg(long, default_value = boundary::DEFAULT_DELIMITER)]
        delimiter: String,
        /// Minimum block length accepted by --detect
        #[arg(long, default_value = "100")]
        min_length: usize,
        /// Minimum keyword hits accepted by --detect
        #[arg(long, default_value = "2")]
        min_keywords: usize,
        /// Write the rendered blocks as markdown here
        #[arg(short, long)]
        markdown: Option<PathBuf>,
        /// Source name stored with each row (default: file name)
        #[arg(long)]
        source: Option<String>,
    },
    /// Show parse statistics
    Stats,
    /// Parsed spells overview table
    Overview {
        /// Filter by base school (e.g. "Evocation")
        #[arg(short, long)]
        school: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Order { files, out_dir, gap } => {
            let config = LayoutConfig {
                gap_threshold: gap,
                ..Default::default()
            };
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            println!("Ordering {} pages...", files.len());
            let counts = order_pages(&files, &out_dir, &config);
            println!(
                "Wrote {} pages to {} ({} empty, {} errors).",
                counts.written,
                out_dir.display(),
                counts.empty,
                counts.errors
            );
            Ok(())
        }
        Commands::Parse {
            file,
            detect,
            delimiter,
            min_length,
            min_keywords,
            markdown,
            source,
        } => {
            let buffer = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let source = source.unwrap_or_else(|| source_name(&file));

            let blocks = if detect {
                let config = BoundaryConfig {
                    min_length,
                    min_keywords,
                };
                boundary::split_detected(&buffer, &delimiter, &config)
            } else {
                boundary::split_blocks(&buffer, &delimiter)
            };
            if blocks.is_empty() {
                println!("No blocks found in {}.", file.display());
                return Ok(());
            }
            info!("Split {} into {} blocks", source, blocks.len());

            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            db::clear_failures(&conn, &source)?;

            println!("Parsing {} blocks...", blocks.len());
            let (counts, rendered) = parse_blocks(&conn, &source, &blocks)?;

            if let Some(path) = markdown {
                std::fs::write(&path, rendered.join(parser::BLOCK_SEPARATOR))
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Markdown written to {}", path.display());
            }
            counts.print();
            Ok(())
        }
        Commands::Overview { school, limit } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, school.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No spells found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<28} | {:<20} | {:<10} | {:<16} | {:<18}",
                "#", "Spell", "School", "Level", "Comp", "Range", "Duration"
            );
            println!("{}", "-".repeat(136));

            for (i, r) in rows.iter().enumerate() {
                let flag = if r.has_warnings { "*" } else { "" };
                println!(
                    "{:>3} | {:<24} | {:<28} | {:<20} | {:<10} | {:<16} | {:<18}",
                    i + 1,
                    truncate(&format!("{}{}", r.name, flag), 24),
                    truncate(&r.school, 28),
                    truncate(&r.level, 20),
                    truncate(&r.components, 10),
                    truncate(&r.range_text, 16),
                    truncate(&r.duration, 18),
                );
            }

            println!("\n{} spells | * = field warnings", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Spells:        {}", s.spells);
            println!("With warnings: {}", s.with_warnings);
            println!("Failures:      {}", s.failures);
            println!("Sources:       {}", s.sources);
            if !s.by_school.is_empty() {
                println!("\n--- Schools ---");
                for (school, count) in &s.by_school {
                    println!("  {:<14} {}", school, count);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Page ordering ──

struct OrderCounts {
    written: usize,
    empty: usize,
    errors: usize,
}

enum PageOutcome {
    Written,
    Empty,
}

fn order_page(path: &Path, out_dir: &Path, config: &LayoutConfig) -> anyhow::Result<PageOutcome> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let blocks = layout::blocks::parse_page_json(&json)
        .with_context(|| format!("decoding OCR result {}", path.display()))?;
    let text = layout::normalize_page_text(&layout::reconstruct_page(&blocks, config));
    if text.is_empty() {
        warn!("{}: no text after column ordering", path.display());
        return Ok(PageOutcome::Empty);
    }
    let stem = path.file_stem().map_or_else(|| "page".into(), |s| s.to_string_lossy());
    let out = out_dir.join(format!("{}.txt", stem));
    std::fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
    Ok(PageOutcome::Written)
}

fn order_pages(files: &[PathBuf], out_dir: &Path, config: &LayoutConfig) -> OrderCounts {
    let pb = progress_bar(files.len());
    let outcomes: Vec<_> = files
        .par_iter()
        .map(|path| {
            let outcome = order_page(path, out_dir, config);
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let mut counts = OrderCounts {
        written: 0,
        empty: 0,
        errors: 0,
    };
    for outcome in outcomes {
        match outcome {
            Ok(PageOutcome::Written) => counts.written += 1,
            Ok(PageOutcome::Empty) => counts.empty += 1,
            Err(e) => {
                warn!("{:#}", e);
                counts.errors += 1;
            }
        }
    }
    counts
}

// ── Block parsing ──

struct ParseCounts {
    /// Distinct spell names stored.
    spells: usize,
    /// Rows overwritten by a later block with the same name.
    replaced: usize,
    failures: usize,
    warnings: usize,
}

impl ParseCounts {
    fn print(&self) {
        println!(
            "Saved {} spells ({} replaced by a later block, {} field warnings), {} failures.",
            self.spells, self.replaced, self.warnings, self.failures,
        );
    }
}

/// Parse blocks in parallel chunks, saving each chunk before the next. Results
/// keep block order.
fn parse_blocks(
    conn: &rusqlite::Connection,
    source: &str,
    blocks: &[&str],
) -> anyhow::Result<(ParseCounts, Vec<String>)> {
    let pb = progress_bar(blocks.len());

    let mut counts = ParseCounts {
        spells: 0,
        replaced: 0,
        failures: 0,
        warnings: 0,
    };
    let mut names: HashSet<String> = HashSet::new();
    let mut rendered = Vec::with_capacity(blocks.len());

    for (chunk_index, chunk) in blocks.chunks(500).enumerate() {
        let offset = chunk_index * 500;
        let results: Vec<ProcessedBlock> = chunk
            .par_iter()
            .enumerate()
            .map(|(i, block)| parser::process_block(source, offset + i, block))
            .collect();

        let mut spells = Vec::new();
        let mut failures = Vec::new();
        for processed in results {
            counts.warnings += processed.warning_count;
            rendered.push(processed.markdown);
            match processed.outcome {
                BlockOutcome::Spell(row) => spells.push(row),
                BlockOutcome::Failure(row) => failures.push(row),
            }
        }

        for row in &spells {
            if !names.insert(row.name.clone()) {
                counts.replaced += 1;
            }
        }
        counts.failures += failures.len();
        db::save_spells(conn, &spells)?;
        db::save_failures(conn, &failures)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    counts.spells = names.len();
    Ok((counts, rendered))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long() {
        assert_eq!(truncate("Fireball", 10), "Fireball");
        assert_eq!(truncate("Mordenkainen's Disjunction", 12), "Mordenkainen...");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn parse_fixture_into_memory_db() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let buffer = std::fs::read_to_string("tests/fixtures/spells.txt").unwrap();
        let blocks = boundary::split_detected(&buffer, boundary::DEFAULT_DELIMITER, &BoundaryConfig::default());

        let (counts, rendered) = parse_blocks(&conn, "spells.txt", &blocks).unwrap();
        assert_eq!(rendered.len(), blocks.len());
        assert_eq!(counts.spells + counts.failures, blocks.len());
        assert_eq!(counts.failures, 1);
        assert!(rendered[0].starts_with("## Fireball\n"));

        let stats = db::get_stats(&conn).unwrap();
        assert_eq!(stats.spells, counts.spells);
        assert_eq!(stats.failures, 1);
    }

    #[test]
    fn duplicate_names_counted_once() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let first = "Light Evocation [Light] Level Sor/Wiz 0 Components V, M Spell Resistance No \
            This object sheds light.";
        let second = "Light Evocation [Light] Level Brd 0, Sor/Wiz 0 Components V, M Spell Resistance No \
            This object sheds light.";
        let sleep = "Sleep Enchantment (Compulsion) Level Sor/Wiz 1 Components V, S, M \
            Spell Resistance Yes A sleep spell causes a magical slumber.";

        let (counts, rendered) = parse_blocks(&conn, "phb.txt", &[first, second, sleep]).unwrap();
        assert_eq!(rendered.len(), 3);
        assert_eq!(counts.spells, 2);
        assert_eq!(counts.replaced, 1);
        assert_eq!(db::get_stats(&conn).unwrap().spells, counts.spells);

        let rows = db::fetch_overview(&conn, None, 10).unwrap();
        assert_eq!(rows[0].name, "Light");
        assert_eq!(rows[0].level, "Brd 0, Sor/Wiz 0");
    }

    #[test]
    fn order_fixture_page() {
        let dir = std::env::temp_dir().join(format!("spellbook-order-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let files = vec![PathBuf::from("tests/fixtures/phb_page.json"), dir.join("missing.json")];

        let counts = order_pages(&files, &dir, &LayoutConfig::default());
        assert_eq!(counts.written, 1);
        assert_eq!(counts.errors, 1);
        let text = std::fs::read_to_string(dir.join("phb_page.txt")).unwrap();
        assert!(text.contains("Fireball"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
