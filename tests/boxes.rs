use std::{error::Error, path::Path};

use test_utils::{check_asm_contains, check_eval, check_failing_type_checking, check_il_contains, Expected};

#[test]
fn a_boxed_primitive_flattens_to_its_zero_value() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/boxes_new_int_flattens.expr"), Expected { stdout: "()\n0", stderr: "" })
}

#[test]
fn rebinding_a_box_with_its_inner_type_is_rejected() -> Result<(), Box<dyn Error>> {
    check_failing_type_checking(Path::new("./tests/fixtures/boxes_reassign_mismatch.expr"))
}

#[test]
fn array_construction_and_indexing_share_backing_storage() -> Result<(), Box<dyn Error>> {
    check_eval(Path::new("./tests/fixtures/arrays_new_index.expr"), Expected { stdout: "()\n()\n42", stderr: "" })
}

#[test]
fn array_new_lowers_to_new_get_and_put() -> Result<(), Box<dyn Error>> {
    check_il_contains(Path::new("./tests/fixtures/arrays_new_index.expr"), &["NEW", "PUT", "GET"])
}

#[test]
fn array_new_allocates_via_calloc() -> Result<(), Box<dyn Error>> {
    check_asm_contains(Path::new("./tests/fixtures/arrays_new_index.expr"), &["calloc"])
}
