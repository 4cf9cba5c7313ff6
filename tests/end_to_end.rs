use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use enma::{
    compile_source,
    link::{assemble, link_exe, toolchain_available},
};

static BUILD_LOCK: Mutex<()> = Mutex::new(());

/// Builds `source` into an executable and returns its stdout.
///
/// These tests are ignored by default; run them with `cargo test -- --ignored`
/// on a machine with nasm and gcc.
fn run(name: &str, source: &str) -> String {
    assert!(toolchain_available(), "nasm and gcc must be on PATH");
    let _guard = BUILD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let scratch: PathBuf = Path::new(env!("CARGO_TARGET_TMPDIR")).join("enma_exec");
    fs::create_dir_all(&scratch).unwrap();

    let asm_path = scratch.join(format!("{name}.asm"));
    let exe_path = scratch.join(name);
    fs::write(&asm_path, compile_source(source).unwrap()).unwrap();

    let object = assemble(&asm_path).unwrap();
    link_exe(&[object], &exe_path).unwrap();

    let out = Command::new(&exe_path).output().unwrap();
    assert!(out.status.success(), "{name} exited with {}", out.status);
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn prints_a_sum() {
    let out = run("sum", "let x = 3; print(x + 4);");
    assert_eq!(out, "7\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn takes_the_then_branch() {
    let source = "let a = 2;\nif => (a == 2) { print(1); } else { print(0); }\n";
    let out = run("branch", source);
    assert_eq!(out, "1\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn arithmetic_follows_precedence() {
    let source = "print(2 + 3 * 4); print((2 + 3) * 4); print(10 - 4 - 3); print(7 / 2); print(0 - 7 / 2);";
    let out = run("arith", source);
    assert_eq!(out, "14\n20\n3\n3\n-3\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn while_counts_down() {
    let source = "let n = 3;\nwhile => (n > 0) {\n  print(n);\n  n = n - 1;\n}\n";
    let out = run("countdown", source);
    assert_eq!(out, "3\n2\n1\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn for_loop_steps_until_limit() {
    let source = "for => (let i = 0 to 6 : 2) { print(i); }\nlet total = 0;\nfor => (i = 0 to 4) { total = total + i; }\nprint(total);";
    let out = run("for_loop", source);
    assert_eq!(out, "0\n2\n4\n6\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn comparisons_yield_zero_or_one() {
    let source = "print(1 < 2); print(2 < 1); print(3 >= 3); print(3 != 3);";
    let out = run("compare", source);
    assert_eq!(out, "1\n0\n1\n0\n");
}

#[test]
#[ignore = "needs nasm and gcc on PATH"]
fn variables_start_at_zero() {
    let source = "if => (0) { let x = 5; } else { print(x); }";
    let out = run("zeroed", source);
    assert_eq!(out, "0\n");
}

#[test]
fn sample_programs_compile() {
    for source in [
        "let x = 3; print(x + 4);",
        "let a = 2;\nif => (a == 2) { print(1); } else { print(0); }\n",
        "if => (0) { let x = 5; } else { print(x); }",
    ] {
        let asm = compile_source(source).unwrap();
        assert!(asm.contains("\tcall printf wrt ..plt\n"), "{source}");
    }
}

#[test]
fn compile_errors_stop_before_assembly() {
    assert!(compile_source("print(missing);").is_err());
    assert!(compile_source("let x = 1").is_err());
}
