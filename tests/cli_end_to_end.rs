#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

const STATEMENT_PAGE: &str = r#"<html><body>
<div id="header">Codeforces</div>
<div class="problemindexholder" problemindex="A">
<div class="alert alert-info">The statement was updated.</div>
<div class="ttypography"><p>Let $$$n$$$ be an integer.</p><p>$$$$$$\sum_{i=1}^{n} i$$$$$$</p></div>
</div>
</body></html>"#;

/// Copies the input HTML to the output path after checking every referenced
/// formula image exists under `--base-url`.
const FAKE_WEASYPRINT: &str = r#"base="$2"
for last; do :; done
input=""
prev=""
for arg; do
  if [ "$arg" = "$last" ]; then input="$prev"; fi
  prev="$arg"
done
for img in $(grep -o 'formula-[^"]*\.svg' "$input"); do
  test -f "$base/$img" || { echo "missing $img" >&2; exit 3; }
done
cp "$input" "$last"
"#;

const FAKE_TEX2SVG: &str = r#"if [ "$1" = "--inline" ]; then shift; fi
printf '<svg>%s</svg>' "$1"
"#;

fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("set perms");
    path
}

fn styles_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("styles")
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("bin")).expect("bin dir");
        Self { dir }
    }

    fn tool(&self, name: &str, body: &str) -> PathBuf {
        fake_tool(&self.dir.path().join("bin"), name, body)
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn command(&self, server: &MockServer) -> Command {
        let weasyprint = self.tool("weasyprint", FAKE_WEASYPRINT);
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cf2pdf"));
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env_remove("CF2PDF_CONFIG_FILE")
            .arg("--fetch-base-url")
            .arg(server.base_url())
            .arg("--pdf-weasyprint-path")
            .arg(weasyprint)
            .arg("--pdf-stylesheets-dir")
            .arg(styles_dir())
            .arg("-d")
            .arg(self.output());
        cmd
    }
}

#[test]
fn graphics_mode_renders_formulas_into_pdf() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/contest/1900/problem/A");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(STATEMENT_PAGE);
    });

    let workspace = Workspace::new();
    let tex2svg = workspace.tool("tex2svg", FAKE_TEX2SVG);
    workspace
        .command(&server)
        .arg("--render-tex2svg-path")
        .arg(tex2svg)
        .args(["-g", "1900", "A"])
        .assert()
        .success()
        .stderr(contains("[fetched]"))
        .stderr(contains("[rendered latex]"))
        .stderr(contains("[done]"));
    mock.assert();

    let pdf = fs::read_to_string(workspace.output().join("1900A.pdf")).expect("pdf written");
    assert!(pdf.contains(r#"Let <img src="formula-"#), "pdf: {pdf}");
    assert!(pdf.contains(r#"<div style="text-align:center;"><img src="formula-"#));
    assert!(!pdf.contains("$$$"));
    assert!(!pdf.contains("The statement was updated."));

    let leftovers: Vec<_> = fs::read_dir(workspace.dir.path().join(".cache"))
        .expect("scratch dir created")
        .collect();
    assert!(leftovers.is_empty(), "scratch files left behind: {leftovers:?}");
}

#[test]
fn failing_renderer_keeps_raw_latex() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/contest/1900/problem/A");
        then.status(200).body(STATEMENT_PAGE);
    });

    let workspace = Workspace::new();
    let tex2htmlcss = workspace.tool("tex2htmlcss", "echo 'engine crashed' >&2\nexit 1\n");
    let assert = workspace
        .command(&server)
        .arg("--render-tex2htmlcss-path")
        .arg(tex2htmlcss)
        .args(["1900", "A"])
        .assert()
        .success()
        .stderr(contains("WARNING:"))
        .stderr(contains("tex2htmlcss"))
        .stderr(contains("[rendered latex]").not())
        .stderr(contains("[done]"));

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf-8 stderr");
    assert_eq!(stderr.matches("WARNING:").count(), 1, "stderr: {stderr}");

    let pdf = fs::read_to_string(workspace.output().join("1900A.pdf")).expect("pdf written");
    assert!(pdf.contains("Let $$$n$$$ be an integer."));
    assert!(pdf.contains(r"$$$$$$\sum_{i=1}^{n} i$$$$$$"));
}

#[test]
fn http_error_fails_without_pdf() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/contest/1/problem/Z");
        then.status(404).body("not here");
    });

    let workspace = Workspace::new();
    workspace
        .command(&server)
        .args(["1", "Z"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("ERROR:"))
        .stderr(contains("404"));

    assert!(!workspace.output().join("1Z.pdf").exists());
}

#[test]
fn missing_statement_block_fails_without_pdf() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/contest/1/problem/A");
        then.status(200)
            .body("<html><body><p>No such problem</p></body></html>");
    });

    let workspace = Workspace::new();
    workspace
        .command(&server)
        .args(["1", "A"])
        .assert()
        .failure()
        .stderr(contains("problemindexholder"));

    assert!(!workspace.output().join("1A.pdf").exists());
}

#[test]
fn conflicting_mode_flags_are_rejected() {
    Command::new(assert_cmd::cargo::cargo_bin!("cf2pdf"))
        .args(["1", "A", "--fast", "--graphics"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}
