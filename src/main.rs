use std::{fs, io, path::PathBuf};

use clap::{ArgAction, Parser};
use hercode::{
    compile,
    driver::{self, Options, Target},
    lex::Lexer,
    parse, translate,
};
use miette::{IntoDiagnostic, Report, Result, WrapErr};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// hercode to native executable compiler
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of input hercode file
    input: PathBuf,

    /// Name of output executable [default: input file stem]
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Code generator to build with
    #[arg(short, long, value_enum, default_value_t = Target::Native)]
    backend: Target,

    /// Delete the generated .c/.asm file after building
    #[arg(short, long)]
    remove_temp: bool,

    /// Keep the intermediate object file
    #[arg(long)]
    keep_object: bool,

    /// Only write the generated .c/.asm file
    #[arg(short = 'S', long)]
    emit_only: bool,

    /// C compiler for the native backend
    #[arg(long, env = "CC", default_value = "cc")]
    cc: PathBuf,

    /// Assembler for the asm backend
    #[arg(long, env = "NASM", default_value = "nasm")]
    nasm: PathBuf,

    /// Linker for the asm backend
    #[arg(long, env = "LD", default_value = "ld")]
    ld: PathBuf,

    /// Print the token stream
    #[arg(long)]
    dump_tokens: bool,

    /// Print the lowered instructions
    #[arg(long)]
    dump_ir: bool,

    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl From<Args> for Options {
    fn from(args: Args) -> Self {
        Options {
            input: args.input,
            output: args.out,
            target: args.backend,
            remove_temp: args.remove_temp,
            keep_object: args.keep_object,
            emit_only: args.emit_only,
            cc: args.cc,
            nasm: args.nasm,
            ld: args.ld,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = fs::read_to_string(&args.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read '{}'", args.input.display()))?;

    if args.dump_tokens {
        for token in Lexer::new(&source) {
            println!("{token}");
        }
    }

    if args.dump_ir {
        // a failed parse is reported below
        if let Ok(parsed) = parse::parse(&source) {
            print!("{}", compile::compile(&parsed.program));
        }
    }

    let compiled = match translate(&source, args.backend) {
        Ok(compiled) => compiled,
        Err(err) => return Err(Report::new(err).with_source_code(source)),
    };
    let errors = compiled
        .diagnostics
        .iter()
        .filter(|diagnostic| !diagnostic.is_warning())
        .count();
    for diagnostic in compiled.diagnostics {
        eprintln!("{:?}", Report::new(diagnostic).with_source_code(source.clone()));
    }
    if errors > 0 {
        warn!(errors, "building from a program with recovered syntax errors");
    }

    let options = Options::from(args);
    driver::build(&options, &compiled.code)?;

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
