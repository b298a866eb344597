use std::{error::Error, path::Path};

use test_utils::{check_eval, check_il_contains, Expected};

#[test]
fn and_or_not_short_circuit_to_the_right_branch() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/booleans_and_or_not.expr"), Expected { stdout: "1", stderr: "" })
}

#[test]
fn chained_comparisons_combine_with_and() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/booleans_comparisons.expr"), Expected { stdout: "1", stderr: "" })
}

#[test]
fn comparisons_lower_to_conditional_jumps_not_boolean_registers() -> Result<(), Box<dyn Error>> {
    check_il_contains(Path::new("./tests/fixtures/booleans_comparisons.expr"), &["IFLT", "IFLE"])
}
