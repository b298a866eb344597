use std::{error::Error, path::Path};

use test_utils::{check_eval, check_failing_type_checking, Expected};

#[test]
fn true_condition_picks_the_then_branch() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/if_true_branch.expr"), Expected { stdout: "1", stderr: "" })
}

#[test]
fn false_condition_picks_the_else_branch() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/if_false_branch.expr"), Expected { stdout: "2", stderr: "" })
}

#[test]
fn mismatched_branch_types_are_rejected() -> Result<(), Box<dyn Error>> {
    check_failing_type_checking(Path::new("./tests/fixtures/if_branch_type_mismatch.expr"))
}
