use std::{error::Error, path::Path};

use test_utils::{check_asm_contains, check_eval, check_il_contains, Expected};

#[test]
fn calling_a_declared_function_evaluates_its_body() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/calls_simple.expr"), Expected { stdout: "()\n7", stderr: "" })
}

#[test]
fn a_call_lowers_to_prm_then_call() -> Result<(), Box<dyn Error>> {
    check_il_contains(Path::new("./tests/fixtures/calls_simple.expr"), &["PRM", "CALL"])
}

#[test]
fn a_direct_call_targets_the_generated_function_label() -> Result<(), Box<dyn Error>> {
    check_asm_contains(Path::new("./tests/fixtures/calls_simple.expr"), &["call\tfn_1"])
}
