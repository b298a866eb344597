use std::{error::Error, path::Path};

use test_utils::{check_asm_contains, check_eval, check_il_contains, Expected};

#[test]
fn self_recursion_computes_a_factorial() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/functions_factorial.expr"), Expected { stdout: "()\n120", stderr: "" })
}

#[test]
fn self_recursion_calls_its_own_generated_label() -> Result<(), Box<dyn Error>> {
    check_il_contains(Path::new("./tests/fixtures/functions_factorial.expr"), &["fn-1"])
}

#[test]
fn self_recursion_assembles_to_a_call_against_its_own_label() -> Result<(), Box<dyn Error>> {
    check_asm_contains(Path::new("./tests/fixtures/functions_factorial.expr"), &["call\tfn_1"])
}
