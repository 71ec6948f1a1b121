//! Command-line front end: argument parsing, file I/O, and a console
//! progress bar around the library's compress/decompress calls.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bppm::{compress, decompress, Config, Progress};

#[derive(Parser)]
#[command(name = "bppm")]
#[command(version)]
#[command(about = "Bitwise PPM file compressor")]
#[command(after_help = "\
Existing output files are overwritten. Options may be given anywhere on \
the command line.

Warning: identical -m and -O values must be passed both when compressing \
and when decompressing; the compressed file does not record them, and a \
mismatch corrupts the output silently.")]
struct Cli {
    /// `c` to compress, `d` to decompress
    #[arg(value_enum)]
    mode: Mode,

    /// File to read
    input: PathBuf,

    /// File to write
    output: PathBuf,

    /// Use at most N MiB of memory for the model
    #[arg(short = 'm', value_name = "N", default_value_t = 128)]
    memory: u32,

    /// Use at most N previous bytes as context
    #[arg(short = 'O', value_name = "N", default_value_t = 4)]
    order: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Compress INPUT into OUTPUT
    #[value(name = "c")]
    Compress,
    /// Decompress INPUT into OUTPUT
    #[value(name = "d")]
    Decompress,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if err.kind() == ErrorKind::DisplayHelp
                || err.kind() == ErrorKind::DisplayVersion =>
        {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bppm: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config {
        memory_mib: cli.memory,
        order_limit: cli.order,
    };
    debug!(
        memory_mib = config.memory_mib,
        order_limit = config.order_limit,
        "configured"
    );

    let input = fs::read(&cli.input)
        .with_context(|| format!("cannot read '{}'", cli.input.display()))?;
    let mut bar = ConsoleBar::new(cli.mode, config.memory_mib);

    let output = match cli.mode {
        Mode::Compress => compress(&input, &config, &mut bar)?,
        Mode::Decompress => decompress(&input, &config, &mut bar)?,
    };

    fs::write(&cli.output, &output)
        .with_context(|| format!("cannot write '{}'", cli.output.display()))?;
    debug!(
        input_len = input.len(),
        output_len = output.len(),
        "finished"
    );
    Ok(())
}

/// Redraw the bar every this many processed bytes.
const REFRESH_PERIOD: u32 = 1 << 18;
const BAR_WIDTH: u64 = 40;

/// Console progress: percentage, a 40-block bar, throughput and arena
/// usage while running, then a summary line.
struct ConsoleBar {
    mode: Mode,
    start: Instant,
    memory_limit: u32,
}

impl ConsoleBar {
    fn new(mode: Mode, memory_limit: u32) -> Self {
        Self {
            mode,
            start: Instant::now(),
            memory_limit,
        }
    }

    fn display(&self, processed: u32, total: u32, memory_mib: u32) {
        let total = u64::from(total.max(1));
        let processed = u64::from(processed);
        let percentage = (processed * 100 + total / 2) / total;
        let blocks = ((processed * BAR_WIDTH + total / 2) / total) as usize;

        let millis = self.start.elapsed().as_millis().max(1) as u64;
        let speed = processed / 1024 * 1000 / millis;

        print!(
            "\r{percentage:3}% [{filled}{empty}] {speed:6} kiB/s {memory_mib}/{limit} MiB",
            filled = "#".repeat(blocks),
            empty = " ".repeat(BAR_WIDTH as usize - blocks),
            limit = self.memory_limit,
        );
        let _ = std::io::stdout().flush();
    }
}

impl Progress for ConsoleBar {
    fn update(&mut self, processed: u32, total: u32, memory_mib: u32) {
        if processed % REFRESH_PERIOD == 0 {
            self.display(processed, total, memory_mib);
        }
    }

    fn finish(&mut self, text_len: u32, code_len: u64, memory_mib: u32) {
        self.display(text_len, text_len, memory_mib);

        let seconds = self.start.elapsed().as_secs_f64();
        let bpc = 8.0 * code_len as f64 / f64::from(text_len);
        let (from, to) = match self.mode {
            Mode::Compress => (u64::from(text_len), code_len),
            Mode::Decompress => (code_len, u64::from(text_len)),
        };
        println!();
        println!("{from} -> {to}, {seconds:.2} s, {bpc:.3} bpc.");
    }
}
