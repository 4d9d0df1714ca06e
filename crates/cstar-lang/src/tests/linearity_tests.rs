//! Usage-linearity rules observed through whole programs.

use super::check_program;

fn check(text: &str) -> crate::parse::Ctx {
    let (_, ctx) = crate::check_snippet(text, true);
    ctx
}

#[test]
fn test_use_before_init() {
    let ctx = check("mut int32 a; int32 b = a + 1;");
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0303", "cst_note"]);
}

#[test]
fn test_strict_value_consumed_twice() {
    let ctx = check("string s = \"a\"; string t = s; string u = s;");
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0302", "cst_note"]);
}

#[test]
fn test_free_value_consumed_twice_is_fine() {
    let ctx = check("int32 n = 3; int32 a = n + 1; int32 b = n + 2;");
    assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
}

#[test]
fn test_strict_value_never_consumed() {
    let ctx = check_program("int32 main() { string s = \"left over\"; return 0; }");
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0301"]);
}

#[test]
fn test_free_value_never_consumed_only_warns() {
    let ctx = check_program("int32 main() { int32 n = 3; return 0; }");
    assert_eq!(ctx.reporter.codes(), ["cst_warn_W0002"]);
}

#[test]
fn test_declared_never_used() {
    let ctx = check_program("int32 main() { mut int32 n; return 0; }");
    assert_eq!(ctx.reporter.codes(), ["cst_warn_W0001"]);
}

#[test]
fn test_underscore_opts_out_of_sweep() {
    let ctx = check_program("int32 main() { int32 _scratch = 3; return 0; }");
    assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
}

#[test]
fn test_static_must_end_provided() {
    let ctx = check_program(
        "int32 next() { static mut int32 c = 0; int32 r = c; c = r + 1; int32 out = r; return out; }",
    );
    assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    let ctx = check_program(
        "int32 bad() { static mut int32 c = 0; int32 r = c; return r; }",
    );
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0312"]);
}

#[test]
fn test_delete_frees_a_strict_value() {
    let ctx = check_program("int32 main() { string s = \"bye\"; delete s; return 0; }");
    assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
}

#[test]
fn test_branches_must_agree() {
    let ctx = check(
        "mut string s = \"x\"; bool ok = true; if ok { string t = s; delete t; }",
    );
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0314", "cst_note"]);
}

#[test]
fn test_const_is_not_assignable() {
    let ctx = check("const int32 k = 1; k = 2; int32 a = k;");
    assert_eq!(ctx.reporter.codes(), ["cst_linear_E0304", "cst_note"]);
}
