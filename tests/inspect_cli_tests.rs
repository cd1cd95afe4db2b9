use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const DEFINITION: &str = r#"{
  "entity": {
    "name": "Book",
    "properties": [
      { "name": "id", "type": "Option<i64>", "id": true, "generated": true },
      { "name": "title", "type": "String", "column": "book_title" },
      { "name": "pages", "type": "i32" }
    ]
  },
  "repository": {
    "name": "BookRepository",
    "entity": "Book",
    "extends": ["CrudRepository"],
    "methods": [
      "findByTitleStartingWith(prefix: String): Vec<Book>",
      "countByPagesGreaterThan(pages: i32): i64"
    ]
  },
  "config": "rustdata://?default_page_size=10"
}"#;

fn inspect(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rustdata-inspect"))
        .args(args)
        .output()
        .unwrap()
}

fn write_definition(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_compile_prints_dispatch_table() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(dir.path(), "book.json", DEFINITION);

    let output = inspect(&["compile", "--definition", &path]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("BookRepository (Book)"));
    assert!(stdout.contains("findByTitleStartingWith(prefix: String): Vec<Book> => FindAllInterceptor"));
    assert!(stdout.contains("CountInterceptor"));
}

#[test]
fn test_compile_reports_all_errors() {
    let dir = TempDir::new().unwrap();
    let broken = DEFINITION
        .replace("findByTitleStartingWith", "findByIsbnStartingWith")
        .replace("countByPagesGreaterThan", "frobnicateByPages");
    let path = write_definition(dir.path(), "broken.json", &broken);

    let output = inspect(&["compile", "--definition", &path]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 error(s) compiling repository BookRepository"), "{stderr}");
}

#[test]
fn test_explain_single_signature() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(dir.path(), "book.json", DEFINITION);

    let output = inspect(&[
        "explain",
        "--definition",
        &path,
        "--method",
        "findById(id: i64): Book",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FindByIdInterceptor"));
    assert!(stdout.contains("matcher:     find"));
}

#[test]
fn test_explain_introspected_result_type() {
    let dir = TempDir::new().unwrap();
    let body = DEFINITION.replace(
        r#""config": "rustdata://?default_page_size=10""#,
        r#""config": "rustdata://?default_page_size=10",
  "introspected": { "BookSummary": ["title", "pages"] }"#,
    );
    let path = write_definition(dir.path(), "summary.json", &body);

    let output = inspect(&[
        "explain",
        "--definition",
        &path,
        "--method",
        "findByPagesGreaterThan(pages: i32): Vec<BookSummary>",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FindAllInterceptor"));
    assert!(stdout.contains("title, pages"), "{stdout}");
}

#[test]
fn test_config_is_normalized() {
    let output = inspect(&["config", "rustdata://?naming=kebab_case&max_page_size=50"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("naming=kebab_case"));
    assert!(stdout.contains("max_page_size=50"));

    let output = inspect(&["config", "postgres://localhost"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_definition_file() {
    let output = inspect(&["compile", "--definition", "/nonexistent/definition.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read definition"));
}
