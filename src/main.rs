use clap::{Parser, Subcommand};
use fixmymix::report::{self, ReportEntry, Summary};
use fixmymix::{
    default_output_name, priority_insights, wav, Analyzer, AudioSignal, Genre, Insight, Mixer,
    Severity, SnapshotAnalyser,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Extensions accepted as mix inputs
const SUPPORTED_EXTENSIONS: [&str; 6] = ["wav", "mp3", "m4a", "aac", "flac", "ogg"];

/// Largest accepted input file
const MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "fixmymix")]
#[command(author, version, about = "Genre-aware mix feedback and two-stem auto-mixing")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Show debug logging and per-insight detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show warnings and the summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mix a beat and a vocal take into a mastered WAV
    Mix {
        /// Beat / instrumental file
        beat: PathBuf,

        /// Vocal file
        vocals: PathBuf,

        /// Genre: general, hiphop, pop, rock, electronic, rnb
        #[arg(short, long, default_value = "general")]
        genre: String,

        /// Output WAV (default: FixMyMix_<genre>_<timestamp>.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for the reverb impulse response (reproducible output)
        #[arg(long)]
        seed: Option<u64>,

        /// Render at this sample rate instead of the lower input rate
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Analyze a mix at regular intervals and print feedback
    Analyze {
        /// Mix to analyze
        file: PathBuf,

        /// Genre: general, hiphop, pop, rock, electronic, jazz
        #[arg(short, long, default_value = "general")]
        genre: String,

        /// Seconds between snapshots
        #[arg(long, default_value = "3")]
        interval: f64,

        /// Insights shown per snapshot
        #[arg(long, default_value = "3")]
        top: usize,

        /// Report file (.json, .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel workers (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = match args.command {
        Command::Mix {
            beat,
            vocals,
            genre,
            output,
            seed,
            sample_rate,
        } => run_mix(&beat, &vocals, &genre, output, seed, sample_rate, args.quiet),
        Command::Analyze {
            file,
            genre,
            interval,
            top,
            output,
            jobs,
        } => {
            if let Some(jobs) = jobs {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build_global()
                    .ok();
            }
            run_analyze(&file, &genre, interval, top, output, args.verbose, args.quiet)
        }
    };

    if let Err(e) = result {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        std::process::exit(1);
    }
}

/// Reject inputs the mixer shouldn't be asked to decode
fn validate_input(path: &Path) -> Result<(), String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "{}: unsupported file type (supported: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    let size = std::fs::metadata(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?
        .len();
    if size > MAX_INPUT_BYTES {
        return Err(format!(
            "{}: file is {:.1}MB, limit is {}MB",
            path.display(),
            size as f64 / (1024.0 * 1024.0),
            MAX_INPUT_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

fn run_mix(
    beat_path: &Path,
    vocals_path: &Path,
    genre: &str,
    output: Option<PathBuf>,
    seed: Option<u64>,
    sample_rate: Option<u32>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_input(beat_path)?;
    validate_input(vocals_path)?;

    let genre = Genre::parse_or_general(genre);
    let mut mixer = Mixer::new();
    if let Some(seed) = seed {
        mixer = mixer.with_seed(seed);
    }
    if let Some(rate) = sample_rate {
        mixer = mixer.with_sample_rate(rate);
    }

    if !quiet {
        eprintln!("\x1b[1mFixMyMix - Auto Mix ({})\x1b[0m", genre);
        eprintln!("{}", "─".repeat(70));
    }

    let (beat, vocals) = rayon::join(
        || AudioSignal::decode_file(beat_path),
        || AudioSignal::decode_file(vocals_path),
    );
    let (beat, vocals) = (beat?, vocals?);

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message("Mixing...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    };

    let rendered = mixer.render(&beat, &vocals, genre);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let (mix, report) = rendered?;

    let output = output.unwrap_or_else(|| PathBuf::from(default_output_name(genre)));
    wav::write_file(&output, mix.buffer())?;

    if !quiet {
        let levels = &report.levels;
        eprintln!(
            "  Beat:    {:>6.1}dB  (peak {:.3})",
            levels.beat.loudness_db, levels.beat.peak
        );
        eprintln!(
            "  Vocals:  {:>6.1}dB  (peak {:.3})",
            levels.vocals.loudness_db, levels.vocals.peak
        );
        eprintln!(
            "  Difference {:.1}dB, dominant: {}",
            levels.level_difference, levels.dominant
        );
        eprintln!(
            "  Gains: beat {:.3}, vocals {:.3}, master {:.2}",
            report.parameters.beat.gain, report.parameters.vocals.gain, report.parameters.master_gain
        );
        eprintln!("{}", "─".repeat(70));
        eprintln!(
            "\x1b[32mMix saved: {}\x1b[0m ({:.1}s, {}Hz, peak {:.3}, {:.0}ms)",
            output.display(),
            report.duration_secs,
            report.sample_rate,
            report.peak,
            report.render_ms
        );
    }

    Ok(())
}

fn run_analyze(
    path: &Path,
    genre: &str,
    interval: f64,
    top: usize,
    output: Option<PathBuf>,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(interval.is_finite() && interval > 0.0) {
        return Err(format!("interval must be positive, got {}", interval).into());
    }

    let genre = Genre::parse_or_general(genre);
    let analyzer = Analyzer::new().with_genre(genre);
    let signal = AudioSignal::decode_file(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut times = SnapshotAnalyser::timeline(&signal, interval);
    if times.is_empty() {
        // Shorter than one interval: look at the end
        times.push(signal.duration_secs());
    }

    if !quiet {
        eprintln!("\x1b[1mFixMyMix - Mix Analysis ({})\x1b[0m", genre);
        eprintln!("{}", "─".repeat(70));
        eprintln!(
            "{}: {:.1}s, {}Hz, {} snapshot(s)\n",
            file_name,
            signal.duration_secs(),
            signal.sample_rate(),
            times.len()
        );
    }

    let pb = if !quiet && times.len() > 1 {
        let pb = ProgressBar::new(times.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let entries: Vec<ReportEntry> = times
        .par_iter()
        .map_init(SnapshotAnalyser::new, |snapshots, &time| {
            let snapshot = snapshots.capture(&signal, time);
            let analysis = analyzer.analyze_snapshot(&snapshot);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(format_time(time));
            }
            ReportEntry {
                file_name: file_name.clone(),
                time_secs: time,
                analysis,
            }
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !quiet {
        for entry in &entries {
            println!("\x1b[1m{}\x1b[0m", format_time(entry.time_secs));
            for insight in priority_insights(&entry.analysis.insights, top) {
                print_insight(&insight, verbose);
            }
        }
    }

    let summary = Summary::from_entries(&entries);
    if !quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[31m! Warnings:\x1b[0m {}", summary.warnings);
        eprintln!("  \x1b[33mi Info:\x1b[0m     {}", summary.info);
        eprintln!("  \x1b[32m✓ Success:\x1b[0m  {}", summary.success);
        eprintln!(
            "  Clean snapshots: {:.0}%",
            summary.clean_ratio(&entries) * 100.0
        );
    }

    if let Some(ref output_path) = output {
        report::generate(output_path, &entries)?;
        if !quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
    }

    Ok(())
}

fn print_insight(insight: &Insight, verbose: bool) {
    let color = match insight.severity {
        Severity::Warning => "\x1b[31m",
        Severity::Info => "\x1b[33m",
        Severity::Success => "\x1b[32m",
    };
    let reset = "\x1b[0m";

    println!(
        "  {}{:<10}{} {:<10} {}",
        color,
        format!("[{}]", insight.severity),
        reset,
        insight.category,
        insight.title
    );
    if verbose {
        println!("             {}", insight.description);
    }
    println!("             \x1b[90m→ {}\x1b[0m", insight.remedy);
}

/// `m:ss`
fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
