//! The six concrete `--eval` scenarios, run end to end through the built
//! binary rather than against the evaluator module directly.
use std::{error::Error, path::Path};

use test_utils::{check_eval, check_failing_type_checking, Expected};

#[test]
fn arithmetic_with_precedence() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/arithmetic_precedence.expr"), Expected { stdout: "()\n7", stderr: "" })
}

#[test]
fn a_two_argument_function_call() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/calls_simple.expr"), Expected { stdout: "()\n7", stderr: "" })
}

#[test]
fn self_recursive_factorial() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/functions_factorial.expr"), Expected { stdout: "()\n120", stderr: "" })
}

#[test]
fn string_concatenation() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/strings_concat.expr"), Expected { stdout: "()\n\"foobar\"", stderr: "" })
}

#[test]
fn array_new_put_and_get() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/arrays_new_index.expr"), Expected { stdout: "()\n()\n42", stderr: "" })
}

#[test]
fn a_bare_if_picks_its_branch() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/if_true_branch.expr"), Expected { stdout: "1", stderr: "" })
}

#[test]
fn a_branch_type_mismatch_is_reported_instead_of_evaluated() -> Result<(), Box<dyn Error>> {
    check_failing_type_checking(Path::new("./tests/fixtures/if_branch_type_mismatch.expr"))
}
