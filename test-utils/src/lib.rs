use std::{
    error::Error,
    io,
    path::Path,
    process::{Command, Output},
    str,
};

const EXPRC_PATH: &str = "./target/debug/exprc";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?.trim_end(), self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run(src_path: &Path, flag: &str) -> Result<Output, io::Error> {
    Command::new(EXPRC_PATH).arg(flag).arg(src_path).output()
}

/// Runs the evaluator stage and asserts its printed values match `expected`.
pub fn check_eval(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run(src_path, "--eval")?;
    expected.assert_matches(&output)?;
    assert!(output.status.success(), "exprc exited with status {:?}", output.status.code());
    Ok(())
}

/// Runs the default (assembly-emission) stage and asserts the emitted text
/// contains every one of `needles` — used where asserting on the full
/// listing would be brittle across incidental label numbering.
pub fn check_asm_contains(src_path: &Path, needles: &[&str]) -> Result<(), Box<dyn Error>> {
    let output = run(src_path, "--asm")?;
    let stdout = str::from_utf8(&output.stdout)?;
    assert!(
        output.status.success(),
        "exprc exited with status {:?}: {}",
        output.status.code(),
        str::from_utf8(&output.stderr)?
    );
    for needle in needles {
        assert!(stdout.contains(needle), "expected assembly to contain {needle:?}, got:\n{stdout}");
    }
    Ok(())
}

/// Runs the IL-generation stage and asserts the textual dump contains every
/// one of `needles`.
pub fn check_il_contains(src_path: &Path, needles: &[&str]) -> Result<(), Box<dyn Error>> {
    let output = run(src_path, "--il")?;
    let stdout = str::from_utf8(&output.stdout)?;
    assert!(
        output.status.success(),
        "exprc exited with status {:?}: {}",
        output.status.code(),
        str::from_utf8(&output.stderr)?
    );
    for needle in needles {
        assert!(stdout.contains(needle), "expected IL dump to contain {needle:?}, got:\n{stdout}");
    }
    Ok(())
}

/// Asserts that type checking the given source fails (non-zero exit).
pub fn check_failing_type_checking(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let output = run(src_path, "--typed-ast")?;
    println!("{output:?}");
    assert!(!output.status.success(), "exprc should have rejected {}", src_path.display());
    Ok(())
}
