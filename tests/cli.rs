use std::fs;
use std::process::Command;

use tempfile::TempDir;

const LAYOUT: &str =
    "first_name:12;last_name:15;middle_initial;age:Integer(3);colors[3]:Integer(4)";

fn flatrec() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flatrec"))
}

fn write_input(dir: &TempDir, lines: &[&str]) -> String {
    let path = dir.path().join("people.dat");
    fs::write(&path, lines.join("\n")).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_decode_prints_records() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["jeremy      lowery         s031000100020003", ""]);
    let out = flatrec()
        .args(["decode", "--layout", LAYOUT, &input])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        concat!(
            "{first_name: \"jeremy\", last_name: \"lowery\", middle_initial: \"s\", ",
            "age: 31, colors: [1, 2, 3]}\n"
        )
    );
}

#[test]
fn test_check_reports_failed_fields() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &[
            "jeremy      lowery         s031000100020003",
            "jeremy      lowery         sX23000100020003",
        ],
    );
    let out = flatrec()
        .args(["check", "--layout", LAYOUT, &input])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "Line 2: Field age - expecting all digits for integer, given='X23'\n"
    );
}

#[test]
fn test_check_clean_input_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["jeremy      lowery         s031000100020003"]);
    let out = flatrec()
        .args(["check", "--layout", LAYOUT, &input])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_reformat_to_output_file() {
    let dir = TempDir::new().unwrap();
    let layout = dir.path().join("people.layout");
    fs::write(
        &layout,
        concat!(
            "# people extract\n",
            "first_name:12\nlast_name:15\nmiddle_initial\n",
            "age:Integer(3)\ncolors[3]:Integer(4)\n",
        ),
    )
    .unwrap();
    let input = write_input(&dir, &["jeremy      lowery         s 31   1   2   3"]);
    let output = dir.path().join("out").join("clean.dat");

    let out = flatrec()
        .args([
            "reformat",
            "--layout-file",
            &layout.to_string_lossy(),
            &input,
            "-o",
            &output.to_string_lossy(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "jeremy      lowery         s031000100020003\n"
    );
}

#[test]
fn test_reformat_fails_on_unconverted() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["jeremy      lowery         sX23000100020003"]);
    let out = flatrec()
        .args(["reformat", "--layout", LAYOUT, &input])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Line 1: field age"));
}

#[test]
fn test_bad_layout_is_reported() {
    let out = flatrec()
        .args(["decode", "--layout", "a:0"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Layout error"));
}
