use std::{
    error::Error,
    fs,
    path::Path,
    process::Command,
};

const EXPRC_PATH: &str = "./target/debug/exprc";

#[test]
fn lex_stage_dumps_one_token_per_lexeme() -> Result<(), Box<dyn Error>> {
    let output = Command::new(EXPRC_PATH).arg("-L").arg("./tests/fixtures/arithmetic_precedence.expr").output()?;
    assert!(output.status.success());
    let stdout = std::str::from_utf8(&output.stdout)?;
    assert!(stdout.contains("INT(1)"));
    assert!(stdout.contains("NAME(x)"));
    Ok(())
}

#[test]
fn ast_stage_has_no_type_annotations() -> Result<(), Box<dyn Error>> {
    let output = Command::new(EXPRC_PATH).arg("-A").arg("./tests/fixtures/arithmetic_precedence.expr").output()?;
    assert!(output.status.success());
    let stdout = std::str::from_utf8(&output.stdout)?;
    assert!(!stdout.contains(" : "));
    Ok(())
}

#[test]
fn typed_ast_stage_carries_type_annotations() -> Result<(), Box<dyn Error>> {
    let output = Command::new(EXPRC_PATH).arg("-T").arg("./tests/fixtures/arithmetic_precedence.expr").output()?;
    assert!(output.status.success());
    let stdout = std::str::from_utf8(&output.stdout)?;
    assert!(stdout.contains(" : "));
    Ok(())
}

#[test]
fn output_flag_writes_to_a_file_instead_of_stdout() -> Result<(), Box<dyn Error>> {
    let out_path = Path::new("./tests/fixtures/.arithmetic_precedence.out");
    let output = Command::new(EXPRC_PATH)
        .arg("--eval")
        .arg("-o")
        .arg(out_path)
        .arg("./tests/fixtures/arithmetic_precedence.expr")
        .output()?;
    assert!(output.status.success());
    assert_eq!(std::str::from_utf8(&output.stdout)?, "");
    let written = fs::read_to_string(out_path)?;
    fs::remove_file(out_path)?;
    assert_eq!(written.trim_end(), "()\n7");
    Ok(())
}

#[test]
fn an_undeclared_name_exits_with_status_one() -> Result<(), Box<dyn Error>> {
    let output = Command::new(EXPRC_PATH).arg("./tests/fixtures/unknown_name.expr").output()?;
    assert!(!output.status.success());
    assert!(!std::str::from_utf8(&output.stderr)?.is_empty());
    Ok(())
}

#[test]
fn a_missing_input_file_exits_with_status_one() -> Result<(), Box<dyn Error>> {
    let output = Command::new(EXPRC_PATH).arg("./tests/fixtures/does_not_exist.expr").output()?;
    assert!(!output.status.success());
    Ok(())
}
