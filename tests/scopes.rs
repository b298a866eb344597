use std::{error::Error, path::Path};

use test_utils::{check_eval, Expected};

#[test]
fn a_nested_function_reads_an_enclosing_variable() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/scopes_nested_read.expr"), Expected { stdout: "()\n()\n10", stderr: "" })
}

#[test]
fn reassigning_inside_a_call_shadows_rather_than_mutates_the_outer_binding() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/scopes_shadow.expr"), Expected { stdout: "()\n()\n2\n1", stderr: "" })
}
