//! The process driver against small shell scripts standing in for `go`.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gorepl_cli::config::{ToolchainConfig, DEFAULT_COMPILE};
use gorepl_cli::repl::Repl;
use gorepl_cli::toolchain::{GoToolchain, RunOutcome, Toolchain, ToolchainError};

// =============================================================================
// Helpers
// =============================================================================

/// A fresh directory under the system temp dir, unique per test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gorepl-test-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
}

/// A fake `go build -o BIN SRC`: rejects sources containing BROKEN, and
/// otherwise emits a binary that runs `program`.
fn fake_go(dir: &Path, program: &str) -> PathBuf {
    let go = dir.join("fake-go");
    let body = format!(
        r#"out="$3"
src="$4"
if grep -q BROKEN "$src"; then
  echo "$src:2:1: syntax error: unexpected BROKEN" >&2
  exit 1
fi
cat > "$out" <<'PROGRAM'
#!/bin/sh
{program}
PROGRAM
chmod +x "$out"
"#
    );
    write_script(&go, &body);
    go
}

/// Fake compilers are started through `sh` rather than exec'd directly, so a
/// script this process just wrote is never executed while a concurrent fork
/// still holds it open for writing.
fn config(dir: &Path, go: PathBuf) -> ToolchainConfig {
    ToolchainConfig {
        go,
        scratch_dir: dir.join("work"),
        compile: format!("sh {}", DEFAULT_COMPILE),
        link: None,
        timeout: Some(Duration::from_secs(10)),
    }
}

// =============================================================================
// Compile
// =============================================================================

#[test]
fn clean_build_then_run() {
    let dir = scratch("clean");
    let go = fake_go(&dir, "echo hello from gorepl");
    let mut tc = GoToolchain::new(config(&dir, go));

    assert_eq!(tc.compile("package main\nfunc main() {}\n").unwrap(), "");
    assert_eq!(
        fs::read_to_string(dir.join("work/gorepl.go")).unwrap(),
        "package main\nfunc main() {}\n"
    );
    assert_eq!(tc.run().unwrap(), RunOutcome::Output("hello from gorepl\n".to_string()));
}

#[test]
fn compiler_diagnostics_are_returned() {
    let dir = scratch("diagnostics");
    let go = fake_go(&dir, "true");
    let mut tc = GoToolchain::new(config(&dir, go));

    let diagnostics = tc.compile("package main\nBROKEN\n").unwrap();
    assert!(diagnostics.contains("syntax error: unexpected BROKEN"));
    assert!(diagnostics.contains("gorepl.go:2:1"));
}

#[test]
fn silent_failure_gets_exit_status() {
    let dir = scratch("silent");
    let go = dir.join("fake-go");
    write_script(&go, "exit 3\n");
    let mut tc = GoToolchain::new(config(&dir, go));

    assert_eq!(tc.compile("package main\n").unwrap(), "exit status 3\n");
}

#[test]
fn link_step_runs_only_after_clean_compile() {
    let dir = scratch("link");
    let go = dir.join("fake-go");
    let marker = dir.join("linked");
    write_script(
        &go,
        &format!(
            r#"case "$1" in
  compile)
    if grep -q BROKEN "$3"; then echo "compile failed" >&2; exit 1; fi
    cp "$3" "$2" ;;
  link)
    touch "{}"
    printf '#!/bin/sh\necho linked\n' > "$2"
    chmod +x "$2" ;;
esac
"#,
            marker.display()
        ),
    );
    let mut cfg = config(&dir, go);
    cfg.compile = "sh {go} compile {obj} {src}".to_string();
    cfg.link = Some("sh {go} link {bin} {obj}".to_string());
    let mut tc = GoToolchain::new(cfg);

    assert_eq!(tc.compile("BROKEN").unwrap(), "compile failed\n");
    assert!(!marker.exists());

    assert_eq!(tc.compile("package main\n").unwrap(), "");
    assert!(marker.exists());
    assert!(dir.join("work/gorepl.o").exists());
    assert_eq!(tc.run().unwrap(), RunOutcome::Output("linked\n".to_string()));
}

#[test]
fn missing_compiler_is_an_error() {
    let dir = scratch("missing");
    let mut cfg = config(&dir, dir.join("no-such-go"));
    cfg.compile = DEFAULT_COMPILE.to_string();
    let mut tc = GoToolchain::new(cfg);
    let err = tc.compile("package main\n").unwrap_err();
    assert!(matches!(err, ToolchainError::Spawn { .. }));
}

#[test]
fn slow_compiler_is_killed() {
    let dir = scratch("timeout");
    let mut cfg = config(&dir, PathBuf::from("go"));
    cfg.compile = "sleep 5".to_string();
    cfg.timeout = Some(Duration::from_millis(200));
    let mut tc = GoToolchain::new(cfg);

    let started = Instant::now();
    let err = tc.compile("package main\n").unwrap_err();
    assert!(matches!(err, ToolchainError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
}

// =============================================================================
// Run
// =============================================================================

#[test]
fn stderr_output_is_the_failure() {
    let dir = scratch("stderr");
    let go = fake_go(&dir, "echo partial\necho 'panic: boom' >&2\nexit 2");
    let mut tc = GoToolchain::new(config(&dir, go));

    assert_eq!(tc.compile("package main\n").unwrap(), "");
    assert_eq!(tc.run().unwrap(), RunOutcome::Diagnostics("panic: boom\n".to_string()));
}

#[test]
fn quiet_nonzero_exit_is_a_failure() {
    let dir = scratch("exit");
    let go = fake_go(&dir, "exit 2");
    let mut tc = GoToolchain::new(config(&dir, go));

    assert_eq!(tc.compile("package main\n").unwrap(), "");
    assert_eq!(tc.run().unwrap(), RunOutcome::Diagnostics("exit status 2\n".to_string()));
}

#[test]
fn large_output_does_not_block() {
    let dir = scratch("large");
    let go = fake_go(&dir, "i=0\nwhile [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done");
    let mut tc = GoToolchain::new(config(&dir, go));

    assert_eq!(tc.compile("package main\n").unwrap(), "");
    match tc.run().unwrap() {
        RunOutcome::Output(out) => {
            assert_eq!(out.lines().count(), 20000);
            assert!(out.ends_with("line-19999\n"));
        }
        other => panic!("expected output, got {:?}", other),
    }
}

// =============================================================================
// Through the controller
// =============================================================================

#[test]
fn controller_rolls_back_on_real_process_failure() {
    let dir = scratch("controller");
    let go = fake_go(&dir, "echo ok");
    let mut repl = Repl::new(GoToolchain::new(config(&dir, go)));

    let mut out = Vec::new();
    repl.handle_line("x := 1", &mut out).unwrap();
    assert_eq!(String::from_utf8_lossy(&out), "ok\n");

    let mut out = Vec::new();
    repl.handle_line("BROKEN := 2", &mut out).unwrap();
    let shown = String::from_utf8_lossy(&out);
    assert!(shown.contains("Compile error"));
    assert!(shown.contains("unexpected BROKEN"));
    assert_eq!(repl.session().statements.len(), 1);
    assert!(repl.session().unstable);
}

/// Needs a Go installation on PATH.
#[test]
#[ignore]
fn real_go_round_trip() {
    let dir = scratch("real-go");
    let mut cfg = config(&dir, PathBuf::from("go"));
    cfg.compile = DEFAULT_COMPILE.to_string();
    let mut repl = Repl::new(GoToolchain::new(cfg));

    let mut line = |text: &str| {
        let mut out = Vec::new();
        repl.handle_line(text, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    };

    assert_eq!(line("x := 21"), "");
    // fmt is imported but not yet used.
    assert_eq!(line("+ fmt"), "");
    assert!(line("y := x").contains("imported and not used"));
    assert_eq!(line("fmt.Println(x * 2)"), "42\n");
    assert_eq!(line(": fmt.Println(x * 2)"), "");
    assert_eq!(line("run"), "42\n");
    assert!(!repl.session().unstable);
    assert_eq!(repl.session().statements.len(), 2);
}
