use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use clap_verbosity_flag::WarnLevel;
use msgpack_lens::DEFAULT_MAX_DEPTH;
use msgpack_lens_cli::{
    convert, decode_input, InputEncoding, InputFormat, Options, OutputEncoding, OutputFormat,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input format
    #[arg(short = 'i', long = "inf", value_enum, default_value_t = InputFormat::Msgp)]
    inf: InputFormat,

    /// Output format
    #[arg(short = 'o', long = "outf", value_enum, default_value_t = OutputFormat::Print)]
    outf: OutputFormat,

    /// Text encoding wrapped around the input bytes
    #[arg(long, value_enum, value_name = "ENC")]
    inenc: Option<InputEncoding>,

    /// Text encoding to wrap around the output
    #[arg(long, value_enum, value_name = "ENC")]
    outenc: Option<OutputEncoding>,

    /// Accept (and show) bytes left over after the first value
    #[arg(long, action = ArgAction::SetTrue)]
    allow_extra: bool,

    /// Never colour printed output
    #[arg(long, action = ArgAction::SetTrue)]
    no_color: bool,

    /// Write typed JSON on a single line
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,

    /// Maximum container nesting
    #[arg(long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// File to read; stdin when absent
    input: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<WarnLevel>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(io::stderr)
        .init();

    let raw = match &cli.input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        None => {
            if io::stdin().is_terminal() {
                Cli::command().print_help()?;
                std::process::exit(2);
            }
            let mut raw = Vec::new();
            io::stdin()
                .read_to_end(&mut raw)
                .context("failed to read stdin")?;
            raw
        }
    };

    let input = decode_input(&raw, cli.inenc).context("failed to decode input")?;
    tracing::debug!(raw = raw.len(), decoded = input.len(), "input read");

    let stdout = io::stdout();
    let options = Options {
        input: cli.inf,
        output: cli.outf,
        output_encoding: cli.outenc,
        allow_extra: cli.allow_extra,
        colors: !cli.no_color
            && std::env::var_os("NO_COLOR").is_none()
            && stdout.is_terminal(),
        pretty: !cli.compact,
        max_depth: cli.max_depth,
    };

    let mut out = stdout.lock();
    convert(&input, &options, &mut out).context("conversion failed")?;
    if options.output_encoding.is_some() && out.is_terminal() {
        writeln!(out)?;
    }
    Ok(())
}
