//! irx86 command-line translator
//!
//! `irx86 <INPUT>` reads one IR module (a path, or `-` for standard input) and
//! writes its x86-64 assembly listing to standard output. Diagnostics and logs
//! go to standard error.

use clap::Parser;
use irx86_codegen::{TargetOptions, X86Backend};
use irx86_error::{DiagnosticRenderer, SourceCache};
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "irx86")]
#[command(version)]
#[command(about = "Translates textual IR into x86-64 assembly", long_about = None)]
struct Cli {
    /// IR file to translate, or `-` for standard input
    #[arg(value_name = "INPUT")]
    input: String,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not read standard input: {0}")]
    Stdin(#[source] io::Error),

    #[error("invalid IR module")]
    InvalidModule(usize),

    #[error("could not write output: {0}")]
    Output(#[source] io::Error),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        if let CliError::InvalidModule(errors) = &err {
            debug!(errors = *errors, "module rejected");
        }
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Reads the input, returning a display name and the text
fn read_input(input: &str) -> Result<(String, String), CliError> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(CliError::Stdin)?;
        return Ok(("<stdin>".to_string(), source));
    }

    let source = fs::read_to_string(input).map_err(|source| CliError::Read {
        path: input.to_string(),
        source,
    })?;
    Ok((input.to_string(), source))
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let (name, source) = read_input(&cli.input)?;
    info!(input = %name, bytes = source.len(), "read input");

    let mut cache = SourceCache::new();
    let file_id = cache.add(name, source.as_str());

    let (module, diagnostics) = irx86_parser::parse_source(&source, file_id);
    if !diagnostics.is_empty() {
        let mut renderer = DiagnosticRenderer::new(&cache);
        if !io::stderr().is_terminal() {
            renderer = renderer.without_colors();
        }
        eprintln!("{}", diagnostics.render(&renderer));
    }
    if diagnostics.has_errors() {
        return Err(CliError::InvalidModule(diagnostics.error_count()));
    }

    let backend = X86Backend::new(TargetOptions::default());
    let mut out = io::BufWriter::new(io::stdout().lock());
    backend.emit(&module, &mut out).map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)?;

    info!(
        functions = module.functions.len(),
        definitions = module.definition_count(),
        globals = module.globals.len(),
        "translated module"
    );

    drop(module);
    debug!("module released");
    Ok(())
}
