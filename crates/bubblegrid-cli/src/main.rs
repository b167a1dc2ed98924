//! bubblegrid CLI: grade bubble sheets and manage answer keys.

use bubblegrid::{
    AnswerKey, LayoutConfig, MergeOutcome, ScanConfig, Scanner, SessionAggregator, SessionLog,
    SuspiciousPolicy,
};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bubblegrid")]
#[command(about = "Optical mark recognition for printed bubble sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more student sheets.
    Scan(CliScanArgs),

    /// Read an answer key from a marked key sheet.
    ReadKey(CliReadKeyArgs),

    /// Generate a random answer key for a layout.
    RandomKey {
        /// Path to the layout JSON.
        #[arg(long)]
        layout: PathBuf,

        /// RNG seed; random when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Path to write the key (JSON); printed to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print a summary of a layout file.
    LayoutInfo {
        /// Path to the layout JSON.
        #[arg(long)]
        layout: PathBuf,
    },
}

/// Flags shared by every command that runs the pipeline.
#[derive(Debug, Clone, Args)]
struct CliConfigArgs {
    /// Path to the layout JSON.
    #[arg(long)]
    layout: PathBuf,

    /// Scan configuration JSON; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the low-contrast presets for shadowed or dim captures.
    #[arg(long)]
    shadow: bool,

    /// Minimum fill ratio for a bubble to count as marked.
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Debug, Clone, Args)]
struct CliScanArgs {
    #[command(flatten)]
    common: CliConfigArgs,

    /// Path to the answer key JSON.
    #[arg(long)]
    key: PathBuf,

    /// Input images, one sheet each.
    #[arg(long, num_args = 1.., required = true)]
    image: Vec<PathBuf>,

    /// Net score deduction per wrong answer.
    #[arg(long)]
    penalty: Option<f64>,

    /// Path to write per-image results and the session (JSON).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Append one line per merged sheet to this log file.
    #[arg(long)]
    session_log: Option<PathBuf>,

    /// Keep suspicious sheets out of the session.
    #[arg(long)]
    discard_suspicious: bool,
}

#[derive(Debug, Clone, Args)]
struct CliReadKeyArgs {
    #[command(flatten)]
    common: CliConfigArgs,

    /// Image of the marked key sheet.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the key (JSON); printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(&args),
        Commands::ReadKey(args) => run_read_key(&args),
        Commands::RandomKey { layout, seed, out } => {
            run_random_key(&layout, seed, out.as_deref())
        }
        Commands::LayoutInfo { layout } => run_layout_info(&layout),
    }
}

// ── config ─────────────────────────────────────────────────────────────

/// Config file (or defaults) with command-line overrides applied.
fn build_scan_config(args: &CliConfigArgs, penalty: Option<f64>) -> CliResult<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path).map_err(|e| -> CliError {
            format!("Failed to load config {}: {}", path.display(), e).into()
        })?,
        None => ScanConfig::new(args.shadow),
    };
    if args.shadow {
        config.set_shadow_mode(true);
    }
    if let Some(t) = args.threshold {
        config.scoring.mark_threshold = t;
    }
    if let Some(p) = penalty {
        config.scoring.penalty = p;
    }
    Ok(config)
}

fn build_scanner(args: &CliConfigArgs, penalty: Option<f64>) -> CliResult<Scanner> {
    let layout = LayoutConfig::from_json_file(&args.layout).map_err(|e| -> CliError {
        format!("Failed to load layout {}: {}", args.layout.display(), e).into()
    })?;
    Ok(Scanner::with_config(layout, build_scan_config(args, penalty)?))
}

fn load_gray(path: &Path) -> CliResult<image::GrayImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_luma8())
}

fn write_or_print(json: &str, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ── scan ───────────────────────────────────────────────────────────────

fn run_scan(args: &CliScanArgs) -> CliResult<()> {
    let key = AnswerKey::from_json_file(&args.key).map_err(|e| -> CliError {
        format!("Failed to load answer key {}: {}", args.key.display(), e).into()
    })?;
    let scanner = build_scanner(&args.common, args.penalty)?.with_answer_key(key);

    let coverage = scanner.answer_key().coverage(scanner.layout());
    if !coverage.is_complete() {
        tracing::warn!(
            "answer key covers {}/{} questions; missing questions grade as wrong",
            coverage.answered,
            coverage.total
        );
    }

    let policy = if args.discard_suspicious {
        SuspiciousPolicy::Discard
    } else {
        SuspiciousPolicy::Record
    };
    let mut session = SessionAggregator::with_policy(policy);
    let mut log = args
        .session_log
        .as_deref()
        .map(SessionLog::open)
        .transpose()?;

    let mut per_image = Vec::with_capacity(args.image.len());
    let mut n_failed = 0usize;
    for path in &args.image {
        let scanned =
            load_gray(path).and_then(|gray| scanner.scan(&gray).map_err(CliError::from));
        let result = match scanned {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("{}: {}", path.display(), e);
                n_failed += 1;
                per_image.push(serde_json::json!({
                    "image": path.display().to_string(),
                    "error": e.to_string(),
                }));
                continue;
            }
        };

        println!(
            "{}: D:{} Y:{} B:{} Coklu:{} Net:{:.2}{}",
            path.display(),
            result.correct_count,
            result.wrong_count,
            result.blank_count,
            result.multi_count,
            result.net_score,
            if result.suspicious { " (suspicious)" } else { "" }
        );

        let outcome = session.merge(&result);
        if let (Some(log), MergeOutcome::Appended { id } | MergeOutcome::Replaced { id }) =
            (log.as_mut(), outcome)
        {
            if let Some(entry) = session.entries().get(id - 1) {
                log.append(entry)?;
            }
        }
        per_image.push(serde_json::json!({
            "image": path.display().to_string(),
            "result": result,
            "session": outcome,
        }));
    }

    let stats = session.stats();
    tracing::info!(
        "Scanned {} images: {} in session, {} failed, {} suspicious",
        args.image.len(),
        stats.entries,
        n_failed,
        stats.suspicious
    );

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "images": per_image,
            "session": session.entries(),
            "stats": stats,
        }))?;
        write_or_print(&json, Some(out))?;
    }
    Ok(())
}

// ── read-key ───────────────────────────────────────────────────────────

fn run_read_key(args: &CliReadKeyArgs) -> CliResult<()> {
    let scanner = build_scanner(&args.common, None)?;
    let gray = load_gray(&args.image)?;
    let reading = scanner.read_answer_key(&gray)?;

    let coverage = reading.key.coverage(scanner.layout());
    tracing::info!(
        "Answer key read: {}/{} questions",
        coverage.answered,
        coverage.total
    );
    if !reading.unread.is_empty() {
        tracing::warn!("Unread questions: {:?}", reading.unread);
    }
    write_or_print(&serde_json::to_string_pretty(&reading.key)?, args.out.as_deref())
}

// ── random-key ─────────────────────────────────────────────────────────

fn run_random_key(layout: &Path, seed: Option<u64>, out: Option<&Path>) -> CliResult<()> {
    let layout = LayoutConfig::from_json_file(layout)?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let key = AnswerKey::random(&layout, &mut rng);
    write_or_print(&serde_json::to_string_pretty(&key)?, out)
}

// ── layout-info ────────────────────────────────────────────────────────

fn run_layout_info(path: &Path) -> CliResult<()> {
    let layout = LayoutConfig::from_json_file(path)?;
    let n_choices: usize = layout.questions.iter().map(|q| q.choices.len()).sum();

    println!("bubblegrid layout {}", path.display());
    println!("  canonical size:  {}x{} px", layout.width, layout.height);
    println!(
        "  markers:         {:.1} px squares, {:.1} px from the edges",
        layout.marker_size_px, layout.marker_offset_px
    );
    println!("  questions:       {}", layout.n_questions());
    println!("  choice bubbles:  {}", n_choices);
    match layout.id_digit_count() {
        0 => println!("  identifier:      none"),
        n => println!("  identifier:      {} digits", n),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_args(shadow: bool, threshold: Option<f64>) -> CliConfigArgs {
        CliConfigArgs {
            layout: PathBuf::from("layout.json"),
            config: None,
            shadow,
            threshold,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = build_scan_config(&config_args(false, Some(0.3)), Some(0.5)).expect("config");
        assert_eq!(cfg.scoring.mark_threshold, 0.3);
        assert_eq!(cfg.scoring.penalty, 0.5);
        assert!(!cfg.shadow_mode());
    }

    #[test]
    fn shadow_flag_selects_shadow_presets() {
        let cfg = build_scan_config(&config_args(true, None), None).expect("config");
        assert_eq!(cfg, ScanConfig::shadow());
    }

    #[test]
    fn shadow_config_file_keeps_its_overrides() {
        let path = std::env::temp_dir().join(format!(
            "bubblegrid-cli-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"shadow_mode":true,"rectified":{"offset":6.0}}"#)
            .expect("write config");

        let mut args = config_args(true, None);
        args.config = Some(path.clone());
        let cfg = build_scan_config(&args, None).expect("config");
        std::fs::remove_file(&path).ok();

        assert!(cfg.shadow_mode());
        assert_eq!(cfg.capture, ScanConfig::shadow().capture);
        assert_eq!(cfg.rectified.offset, 6.0);
    }

    #[test]
    fn scan_accepts_several_images() {
        let cli = Cli::try_parse_from([
            "bubblegrid",
            "scan",
            "--layout",
            "l.json",
            "--key",
            "k.json",
            "--image",
            "a.png",
            "b.png",
            "--discard-suspicious",
        ])
        .expect("parse");
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.image.len(), 2);
        assert!(args.discard_suspicious);
        assert!(args.penalty.is_none());
    }
}
