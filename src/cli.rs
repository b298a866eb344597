//! Argument parsing for the compiler driver. Grounded on the teacher's own
//! `src/bin/why/cli.rs`: a derived `clap::Parser` struct plus a
//! `ValueEnum` log-level with a `From<&LogLevel> for log::Level` to feed
//! `simple_logger`.

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source file to compile.
    #[arg(index = 1)]
    pub input: std::path::PathBuf,

    /// Where to write the result. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Stop after lexing and dump the token stream.
    #[arg(short = 'L', long)]
    pub lex: bool,

    /// Stop after parsing and dump the untyped tree.
    #[arg(short = 'A', long)]
    pub ast: bool,

    /// Stop after type checking and dump the typed tree.
    #[arg(short = 'T', long = "typed-ast")]
    pub typed_ast: bool,

    /// Stop after generating the intermediate representation and dump it.
    #[arg(short = 'I', long)]
    pub il: bool,

    /// Stop after emitting assembly (the default: this crate never invokes
    /// an assembler or linker).
    #[arg(short = 'S', long)]
    pub asm: bool,

    /// Run the program with the tree-walking evaluator instead of
    /// compiling it, and print the value of every top-level statement.
    #[arg(long)]
    pub eval: bool,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short = 'v', long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }

    /// Which stage to stop at. Unlike the source's `switch` over
    /// last-flag-wins `getopt` output, flags here are checked in a fixed
    /// precedence (earliest pipeline stage first) since `clap` doesn't
    /// preserve the order flags were given in.
    pub fn stage(&self) -> Stage {
        if self.lex {
            Stage::Lex
        } else if self.ast {
            Stage::Ast
        } else if self.typed_ast {
            Stage::TypedAst
        } else if self.il {
            Stage::Il
        } else if self.eval {
            Stage::Eval
        } else {
            Stage::Asm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Ast,
    TypedAst,
    Il,
    Asm,
    Eval,
}

/// Log level, reused from the teacher's binary verbatim: `clap` parses it,
/// `simple_logger` consumes the `log::Level` it converts to.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,

    #[value(alias("1"))]
    Warn,

    #[value(alias("2"))]
    Info,

    #[value(alias("3"))]
    Debug,

    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
