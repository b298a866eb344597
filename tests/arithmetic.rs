use std::{error::Error, path::Path};

use test_utils::{check_asm_contains, check_eval, check_il_contains, Expected};

#[test]
fn precedence_is_multiply_before_add() -> Result<(), Box<dyn Error>> {
    check_eval(
        Path::new("./tests/fixtures/arithmetic_precedence.expr"),
        Expected { stdout: "()\n7", stderr: "" },
    )
}

#[test]
fn integer_division_and_modulo_truncate_toward_zero() -> Result<(), Box<dyn Error>> {
    check_eval(
        Path::new("./tests/fixtures/arithmetic_div_mod.expr"),
        Expected { stdout: "()\n()\n3\n2", stderr: "" },
    )
}

#[test]
fn string_plus_concatenates() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/strings_concat.expr"), Expected { stdout: "()\n\"foobar\"", stderr: "" })
}

#[test]
fn lowers_to_the_expected_il_opcodes() -> Result<(), Box<dyn Error>> {
    check_il_contains(Path::new("./tests/fixtures/arithmetic_precedence.expr"), &["MUL", "ADD"])
}

#[test]
fn div_and_mod_lower_to_idivl() -> Result<(), Box<dyn Error>> {
    check_asm_contains(Path::new("./tests/fixtures/arithmetic_div_mod.expr"), &["idivl"])
}
