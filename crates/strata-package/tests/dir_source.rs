use std::fs;
use std::path::Path;

use strata_package::{package, DirScriptSource, PackageError, PackageOptions, ScriptKind, ScriptSource};
use strata_plan::parse_plan;

const PLAN: &str = "%syntax-version=1.0.0\n%project=template\n%uri=template\n\n\
    schema 2024-01-01T00:00:00Z Ada <ada@example.com>\n\
    tables/users [schema] 2024-01-02T00:00:00Z Ada <ada@example.com>\n\
    schema 2024-01-03T00:00:00Z Ada <ada@example.com>\n";

fn write_script(root: &Path, kind: ScriptKind, change: &str, body: &str) {
    let path = root.join(kind.script_path(change));
    fs::create_dir_all(path.parent().expect("script dir")).expect("create dirs");
    fs::write(path, body).expect("write script");
}

#[test]
fn reads_scripts_from_nested_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    for change in ["schema", "tables/users"] {
        for kind in ScriptKind::ALL {
            write_script(
                dir.path(),
                kind,
                change,
                &format!("-- {kind} launchql-extension-name {change}\n"),
            );
        }
    }

    let source = DirScriptSource::new(dir.path());
    assert_eq!(
        source.read(ScriptKind::Verify, "tables/users").expect("verify"),
        "-- verify launchql-extension-name tables/users\n"
    );

    let plan = parse_plan(PLAN).plan;
    let package = package(&plan, &source, &PackageOptions::new("shop")).expect("package");

    assert_eq!(
        package
            .file("revert/tables/users.sql")
            .expect("revert script")
            .content,
        "-- revert shop tables/users\n"
    );
    // the duplicate `schema` change contributes neither scripts nor a plan line
    assert_eq!(package.files.len(), 8);
    assert_eq!(package.warnings.len(), 1);
    assert!(package.externals.is_empty());
}

#[test]
fn missing_file_is_reported_with_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = DirScriptSource::new(dir.path());
    match source.read(ScriptKind::Deploy, "schema") {
        Err(PackageError::MissingScript { path, .. }) => {
            assert_eq!(path, dir.path().join("deploy").join("schema.sql"));
        }
        other => panic!("expected missing script, got {other:?}"),
    }
}

#[test]
fn change_names_cannot_escape_the_package() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source_root = dir.path().join("src");
    let outside = dir.path().join("escaped.sql");
    fs::write(&outside, "-- outside\n").expect("write outside file");
    for kind in ScriptKind::ALL {
        fs::create_dir_all(source_root.join(kind.dir()).join("a")).expect("dirs");
    }

    let plan = parse_plan(
        "%syntax-version=1.0.0\n%project=template\n%uri=template\n\n\
         a/../../escaped 2024-01-01T00:00:00Z Ada <ada@example.com>\n",
    );
    assert!(plan.is_valid(), "{:?}", plan.report.errors);

    let source = DirScriptSource::new(&source_root);
    assert!(matches!(
        source.read(ScriptKind::Deploy, "a/../../escaped"),
        Err(PackageError::UnsafePath { .. })
    ));
    match package(&plan.plan, &source, &PackageOptions::new("shop")) {
        Err(PackageError::UnsafePath { change, path }) => {
            assert_eq!(change, "a/../../escaped");
            assert!(path.starts_with("deploy"));
        }
        other => panic!("expected unsafe path, got {other:?}"),
    }
}
