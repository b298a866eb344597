mod cli;

use std::fs;
use std::process::ExitCode;

use log::info;

use cli::{Cli, Stage};
use exprc::error::CompileError;
use exprc::il::Functions;
use exprc::lexer::Lexer;
use exprc::{asm, checker, evaluator, il, parser};

fn main() -> ExitCode {
    let args = Cli::init();
    simple_logger::init_with_level((&args.verbosity).into()).expect("only one logger is ever installed");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<(), CompileError> {
    let path = &args.input;
    let source = fs::read_to_string(path).map_err(|e| CompileError::Io(format!("{}: {e}", path.display())))?;
    let filename = path.to_string_lossy().into_owned();

    info!("> lexing {filename}");
    let tokens = Lexer::new(filename.clone(), &source).lex()?;
    if args.stage() == Stage::Lex {
        let dump: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        return write_output(args, &dump.join("\n"));
    }

    info!("> parsing {filename}");
    let mut tree = parser::parse(&filename, tokens)?;
    if args.stage() == Stage::Ast {
        return write_output(args, &tree.serialize(false));
    }

    info!("> type checking");
    checker::check(&mut tree)?;
    if args.stage() == Stage::TypedAst {
        return write_output(args, &tree.serialize(true));
    }

    if args.stage() == Stage::Eval {
        info!("> evaluating");
        let values = evaluator::evaluate(&tree);
        let dump: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        return write_output(args, &dump.join("\n"));
    }

    info!("> generating intermediate code");
    let funcs = il::gen::generate(&tree)?;
    if args.stage() == Stage::Il {
        return write_output(args, &dump_il(&funcs));
    }

    info!("> compiling intermediate code to x86 32-bit assembly");
    let text = asm::generate(&funcs)?;
    write_output(args, &text)
}

fn dump_il(funcs: &Functions) -> String {
    let mut out = String::new();
    for func in funcs.iter() {
        out.push_str(&func.name);
        out.push_str(":\n");
        for block in func.blocks() {
            out.push_str("  ");
            out.push_str(&block.name);
            out.push_str(":\n");
            for inst in &block.insts {
                out.push_str("    ");
                out.push_str(&inst.to_string());
                out.push('\n');
            }
        }
    }
    out
}

fn write_output(args: &Cli, text: &str) -> Result<(), CompileError> {
    match &args.output {
        Some(path) => fs::write(path, format!("{text}\n")).map_err(|e| CompileError::Io(format!("{}: {e}", path.display()))),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
