//! Moorer - offline reverb for WAVE files
//!
//! Loads a PCM WAVE file, runs every channel through a Moorer
//! comb/all-pass reverberator, normalizes the result and writes it back.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use moorer_audio::{apply_reverb, apply_reverb_parallel, normalize, ReverbEngine};
use moorer_library::{wave, BitDepth, Config};

#[derive(Parser)]
#[command(name = "moorer", version, about = "Moorer reverb for PCM WAVE files")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply reverb to a WAVE file
    Process(ProcessArgs),
    /// Print the format of a WAVE file
    Info {
        input: PathBuf,
    },
    /// Print the effective reverb parameters
    Params {
        /// Config file to read instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ProcessArgs {
    input: PathBuf,
    output: PathBuf,

    /// Dry share in percent
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    dry: Option<u32>,

    /// Reverb tail appended after the input, in milliseconds
    #[arg(long)]
    tail_ms: Option<u32>,

    /// Output peak level in dBFS
    #[arg(long, allow_negative_numbers = true)]
    normalize_db: Option<f32>,

    /// Output bits per sample (8 or 16)
    #[arg(long, value_parser = parse_bits)]
    bits: Option<u16>,

    /// Skip the reverb, only normalize and convert
    #[arg(long)]
    bypass: bool,

    /// Render channels on separate threads
    #[arg(long)]
    parallel: bool,

    /// Config file to read instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store the parameters used for this run back into the config file
    #[arg(long)]
    save_config: bool,
}

impl ProcessArgs {
    /// Command-line values win over the config file
    fn override_config(&self, config: &mut Config) {
        if let Some(dry) = self.dry {
            config.dry_percent = Some(dry);
        }
        if let Some(tail_ms) = self.tail_ms {
            config.tail_ms = tail_ms;
        }
        if let Some(db) = self.normalize_db {
            config.normalize_db = db;
        }
        if let Some(bits) = self.bits {
            config.bit_depth = bits;
        }
    }
}

fn parse_bits(s: &str) -> Result<u16, String> {
    let bits: u16 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    BitDepth::from_bits(bits)
        .map(BitDepth::bits)
        .ok_or_else(|| format!("{bits}-bit output is not supported (use 8 or 16)"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process(args) => process(&args),
        Commands::Info { input } => info(&input),
        Commands::Params { config } => params(config.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to read config {}", path.display())),
        None => Ok(Config::load()),
    }
}

fn process(args: &ProcessArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.override_config(&mut config);
    anyhow::ensure!(
        BitDepth::from_bits(config.bit_depth).is_some(),
        "Unsupported bit depth in config: {}",
        config.bit_depth
    );

    let input = wave::load(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut engine = ReverbEngine::new(input.rate());
    config.apply(&mut engine);

    let mut output = if args.bypass {
        tracing::info!("Reverb bypassed");
        input
    } else if args.parallel {
        apply_reverb_parallel(&input, &engine, config.tail_ms)
    } else {
        apply_reverb(&input, &engine, config.tail_ms)
    };

    // An explicit target must be met; the configured one is best effort
    match normalize(&mut output, config.normalize_db) {
        Ok(()) => {}
        Err(e) if args.normalize_db.is_some() => {
            return Err(e).context("Failed to normalize output");
        }
        Err(e) => tracing::warn!(error = %e, "Skipping normalization"),
    }

    wave::save(&args.output, &output, config.bit_depth)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if args.save_config {
        config.capture(&engine);
        match &args.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
        .context("Failed to save config")?;
    }

    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let (buffer, format) = wave::load_with_format(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("{}", input.display());
    println!("  channels:     {}", format.channels);
    println!("  sample rate:  {} Hz", format.sample_rate);
    println!("  bit depth:    {}", format.bit_depth.bits());
    println!("  block align:  {}", format.block_align);
    println!("  frames:       {}", buffer.frames());
    println!("  duration:     {:.3} s", buffer.duration_secs());
    Ok(())
}

fn params(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut engine = ReverbEngine::default();
    config.apply(&mut engine);

    print!("{}", format_params(&engine, &config));
    Ok(())
}

/// Render the parameter table shown by `moorer params`
fn format_params(engine: &ReverbEngine, config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "sampling rate  {} Hz", engine.sampling_rate());
    let dry = engine.dry_percentage();
    let _ = writeln!(out, "dry / wet      {}% / {}%", dry, 100 - dry);
    let _ = writeln!(out, "tail           {} ms", config.tail_ms);
    let _ = writeln!(out, "normalize      {} dB", config.normalize_db);
    let _ = writeln!(out, "bit depth      {}", config.bit_depth);
    let _ = writeln!(
        out,
        "all-pass       {} ms  a={:.3}",
        engine.all_pass_delay_ms(),
        engine.all_pass_coefficient()
    );

    let _ = writeln!(out, "comb  delay     g        R        zf");
    for (i, comb) in engine.combs().iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<5} {:>3} ms  {:.4}   {:.4}   {:.4}",
            i + 1,
            engine.comb_delay_ms(i).unwrap_or_default(),
            comb.low_pass(),
            comb.gain_constant(),
            comb.zero_freq_gain()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use moorer_audio::{AudioBuffer, NUM_COMBS};

    fn parse_process(args: &[&str]) -> ProcessArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Process(args) => args,
            _ => panic!("expected process subcommand"),
        }
    }

    #[test]
    fn test_parse_process_flags() {
        let args = parse_process(&[
            "moorer", "process", "in.wav", "out.wav", "--dry", "40", "--tail-ms", "200",
            "--normalize-db", "-3", "--bits", "8", "--parallel",
        ]);
        assert_eq!(args.input, PathBuf::from("in.wav"));
        assert_eq!(args.output, PathBuf::from("out.wav"));
        assert_eq!(args.dry, Some(40));
        assert_eq!(args.tail_ms, Some(200));
        assert_eq!(args.normalize_db, Some(-3.0));
        assert_eq!(args.bits, Some(8));
        assert!(args.parallel);
        assert!(!args.bypass);
    }

    #[test]
    fn test_rejects_bad_flags() {
        let with = |extra: [&'static str; 2]| {
            let mut args = vec!["moorer", "process", "a.wav", "b.wav"];
            args.extend(extra);
            args
        };

        assert!(Cli::try_parse_from(with(["--bits", "24"])).is_err());
        assert!(Cli::try_parse_from(with(["--dry", "101"])).is_err());
        assert!(Cli::try_parse_from(["moorer", "process", "a.wav"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.dry_percent = Some(90);
        config.tail_ms = 2000;

        let args = parse_process(&["moorer", "process", "a.wav", "b.wav", "--dry", "25"]);
        args.override_config(&mut config);

        assert_eq!(config.dry_percent, Some(25));
        assert_eq!(config.tail_ms, 2000);
        assert_eq!(config.bit_depth, 16);
    }

    #[test]
    fn test_format_params_lists_every_comb() {
        let config = Config::default();
        let engine = ReverbEngine::default();
        let text = format_params(&engine, &config);

        assert!(text.contains("44100 Hz"));
        assert!(text.contains("90% / 10%"));
        assert!(text.contains(" 50 ms"));
        assert!(text.contains(" 78 ms"));
        assert_eq!(text.lines().count(), 7 + NUM_COMBS);
    }

    #[test]
    fn test_process_writes_output_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let config_path = dir.path().join("config.txt");

        let mut buffer = AudioBuffer::new(800, 8000, 2);
        *buffer.sample_mut(0, 0) = 0.5;
        *buffer.sample_mut(0, 1) = -0.5;
        wave::save(&input, &buffer, 16).unwrap();

        let args = parse_process(&[
            "moorer",
            "process",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--tail-ms",
            "100",
            "--bits",
            "8",
            "--config",
            config_path.to_str().unwrap(),
            "--save-config",
        ]);
        // a missing config file is an error when named explicitly
        assert!(process(&args).is_err());

        Config::default().save_to(&config_path).unwrap();
        process(&args).unwrap();

        let (rendered, format) = wave::load_with_format(&output).unwrap();
        assert_eq!(format.bit_depth, BitDepth::Eight);
        assert_eq!(rendered.frames(), 800 + 800);
        assert_eq!(rendered.channels(), 2);

        let saved = Config::load_from(&config_path).unwrap();
        assert_eq!(saved.tail_ms, 100);
        assert_eq!(saved.bit_depth, 8);
        assert_eq!(saved.dry_percent, Some(90));
        assert_eq!(saved.combs[0].delay_ms, Some(50));
    }

    #[test]
    fn test_explicit_normalize_target_must_be_met() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let config_path = dir.path().join("config.txt");
        Config::default().save_to(&config_path).unwrap();

        wave::save(&input, &AudioBuffer::new(16, 8000, 1), 16).unwrap();

        let run = |extra: &[&str]| {
            let mut argv = vec![
                "moorer",
                "process",
                input.to_str().unwrap(),
                output.to_str().unwrap(),
                "--bypass",
                "--config",
                config_path.to_str().unwrap(),
            ];
            argv.extend_from_slice(extra);
            process(&parse_process(&argv))
        };

        // silent input with the configured target is written as is
        run(&[]).unwrap();
        assert_eq!(wave::load(&output).unwrap().frames(), 16);

        std::fs::remove_file(&output).unwrap();
        assert!(run(&["--normalize-db", "-1"]).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_bypass_keeps_length() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let config_path = dir.path().join("config.txt");
        Config::default().save_to(&config_path).unwrap();

        let buffer = AudioBuffer::from_interleaved(vec![0.1, -0.2, 0.3, -0.4], 8000, 1);
        wave::save(&input, &buffer, 16).unwrap();

        let args = parse_process(&[
            "moorer",
            "process",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--bypass",
            "--config",
            config_path.to_str().unwrap(),
        ]);
        process(&args).unwrap();

        let rendered = wave::load(&output).unwrap();
        assert_eq!(rendered.frames(), 4);
    }
}
