//! Unit tests for fixture discovery and include resolution

use crate::common::{fixture, fixture_source};
use conformance_harness::{FixtureLoader, FragmentKind, HarnessError, IncludeTable, Selection};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn table() -> IncludeTable {
    let mut table = IncludeTable::new();
    table.insert("assert.js", "// assert");
    table.insert("sta.js", "// sta");
    table.insert("doneprintHandle.js", "// done");
    table.insert("propertyHelper.js", "// property");
    table.insert("compareArray.js", "// compare");
    table
}

fn names(fragments: &[conformance_harness::Fragment]) -> Vec<&str> {
    fragments.iter().map(|f| f.name()).collect()
}

#[test]
fn test_discover_sorted_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "language/b.js", &fixture_source("", ""));
    write(root, "built-ins/z.js", &fixture_source("", ""));
    write(root, "built-ins/a.js", &fixture_source("", ""));
    write(root, "a.js", &fixture_source("", ""));

    let loader = FixtureLoader::new([root], table());
    let ids: Vec<String> = loader.discover().unwrap().into_iter().map(|s| s.id).collect();

    assert_eq!(
        ids,
        vec!["a.js", "built-ins/a.js", "built-ins/z.js", "language/b.js"]
    );
}

#[test]
fn test_discover_skips_non_fixtures() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "test.js", &fixture_source("", ""));
    write(root, "README.md", "# readme");
    write(root, "module_FIXTURE.js", "export var x = 1;");
    write(root, "data.json", "{}");

    let loader = FixtureLoader::new([root], table());
    let sources = loader.discover().unwrap();

    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, "test.js");
}

#[test]
fn test_discover_single_file_root() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("single.js");
    fs::write(&file, fixture_source("", "")).unwrap();

    let loader = FixtureLoader::new([&file], table());
    let sources = loader.discover().unwrap();

    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, "single.js");
    assert_eq!(sources[0].path, file);
}

#[test]
fn test_discover_missing_root_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let loader = FixtureLoader::new([temp_dir.path().join("nope")], table());

    let err = loader.discover().unwrap_err();
    assert!(matches!(err, HarnessError::Io { .. }));
    assert!(err.is_setup_error());
}

#[test]
fn test_duplicate_id_across_roots() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(first.path(), "shared/dup.js", &fixture_source("", ""));
    write(first.path(), "only-first.js", &fixture_source("", ""));
    write(second.path(), "shared/dup.js", &fixture_source("", ""));

    let loader = FixtureLoader::new([first.path(), second.path()], table());
    let err = loader.discover().unwrap_err();

    assert!(matches!(err, HarnessError::DuplicateFixtureId { ref id } if id == "shared/dup.js"));
    assert!(err.is_setup_error());
}

#[test]
fn test_distinct_roots_merge() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(first.path(), "b.js", &fixture_source("", ""));
    write(second.path(), "a.js", &fixture_source("", ""));

    let loader = FixtureLoader::new([first.path(), second.path()], table());
    let ids: Vec<String> = loader.discover().unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["a.js", "b.js"]);
}

#[test]
fn test_resolve_implicit_then_declared() {
    let loader = FixtureLoader::new(Vec::<&Path>::new(), table());
    let fixture = fixture(
        "t.js",
        "includes: [propertyHelper.js, compareArray.js]",
        "1;",
    );

    let fragments = loader.resolve(&fixture).unwrap();
    assert_eq!(
        names(&fragments),
        vec![
            "assert.js",
            "sta.js",
            "propertyHelper.js",
            "compareArray.js",
            "<body>"
        ]
    );
    assert_eq!(fragments[2].source, "// property");
    assert!(fragments.last().unwrap().is_body());
    assert_eq!(fragments.last().unwrap().source, fixture.source);
}

#[test]
fn test_resolve_dedups_first_occurrence() {
    let loader = FixtureLoader::new(Vec::<&Path>::new(), table());
    let fixture = fixture(
        "t.js",
        "includes: [compareArray.js, assert.js, compareArray.js]",
        "",
    );

    let fragments = loader.resolve(&fixture).unwrap();
    assert_eq!(
        names(&fragments),
        vec!["assert.js", "sta.js", "compareArray.js", "<body>"]
    );
}

#[test]
fn test_resolve_async_adds_done_handler() {
    let loader = FixtureLoader::new(Vec::<&Path>::new(), table());
    let fixture = fixture("t.js", "flags: [async]", "");

    let fragments = loader.resolve(&fixture).unwrap();
    assert_eq!(
        names(&fragments),
        vec!["assert.js", "sta.js", "doneprintHandle.js", "<body>"]
    );
}

#[test]
fn test_resolve_raw_has_no_implicit_includes() {
    let loader = FixtureLoader::new(Vec::<&Path>::new(), table());
    let fixture = fixture("t.js", "flags: [raw]", "");

    let fragments = loader.resolve(&fixture).unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].kind, FragmentKind::Body);
}

#[test]
fn test_resolve_unknown_include() {
    let loader = FixtureLoader::new(Vec::<&Path>::new(), table());
    let fixture = fixture("t.js", "includes: [missingHelper.js]", "");

    let err = loader.resolve(&fixture).unwrap_err();
    assert!(matches!(err, HarnessError::UnresolvedInclude { ref name } if name == "missingHelper.js"));
    assert!(!err.is_setup_error());
}

#[test]
fn test_includes_dir_overlays_bundled() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("assert.js"), "// replaced").unwrap();
    fs::write(temp_dir.path().join("extra.js"), "// extra").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let bundled = IncludeTable::bundled();
    let count = bundled.len();
    let table = bundled.with_dir(temp_dir.path()).unwrap();

    assert_eq!(table.get("assert.js"), Some("// replaced"));
    assert_eq!(table.get("extra.js"), Some("// extra"));
    assert!(table.contains("sta.js"));
    assert!(!table.contains("notes.txt"));
    assert_eq!(table.len(), count + 1);
}

#[test]
fn test_bundled_includes_present() {
    let table = IncludeTable::bundled();
    for name in ["assert.js", "sta.js", "doneprintHandle.js", "propertyHelper.js"] {
        assert!(table.contains(name), "missing bundled include {}", name);
    }
    assert!(table.get("sta.js").unwrap().contains("Test262Error"));
    assert!(table
        .get("sta.js")
        .unwrap()
        .contains("Test262Error.prototype.name = \"Test262Error\""));
}

#[test]
fn test_fixtures_apply_selection() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "a.js", &fixture_source("features: [BigInt]", ""));
    write(root, "b.js", &fixture_source("features: [Atomics, BigInt]", ""));
    write(root, "c.js", &fixture_source("flags: [onlyStrict]", ""));
    write(root, "sub/d.js", &fixture_source("features: [BigInt]", ""));

    let selection = Selection {
        features: vec!["BigInt".into()],
        exclude_features: vec!["Atomics".into()],
        ..Selection::default()
    };
    let loader = FixtureLoader::new([root], table()).with_selection(selection);
    let ids: Vec<String> = loader
        .fixtures()
        .unwrap()
        .map(|f| f.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["a.js", "sub/d.js"]);

    let selection = Selection {
        path_filter: Some("sub/".into()),
        ..Selection::default()
    };
    let loader = FixtureLoader::new([root], table()).with_selection(selection);
    assert_eq!(loader.fixtures().unwrap().count(), 1);

    let selection = Selection {
        flags: vec!["onlyStrict".into()],
        ..Selection::default()
    };
    let loader = FixtureLoader::new([root], table()).with_selection(selection);
    let ids: Vec<String> = loader
        .fixtures()
        .unwrap()
        .map(|f| f.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["c.js"]);
}

#[test]
fn test_fixtures_yield_load_errors() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "good.js", &fixture_source("", ""));
    write(root, "bad.js", "// no front matter\n");

    let loader = FixtureLoader::new([root], table());
    let results: Vec<_> = loader.fixtures().unwrap().collect();

    assert_eq!(results.len(), 2);
    let (source, err) = results[0].as_ref().unwrap_err();
    assert_eq!(source.id, "bad.js");
    assert!(matches!(err, HarnessError::MalformedMetadata { .. }));
    assert_eq!(results[1].as_ref().unwrap().id, "good.js");
}

#[test]
fn test_fixtures_sequence_is_repeatable() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["c.js", "a.js", "b/x.js"] {
        write(root, name, &fixture_source("", ""));
    }

    let loader = FixtureLoader::new([root], table());
    let first: Vec<String> = loader.fixtures().unwrap().map(|f| f.unwrap().id).collect();
    let second: Vec<String> = loader.fixtures().unwrap().map(|f| f.unwrap().id).collect();
    assert_eq!(first, second);
    assert_eq!(first, vec!["a.js", "b/x.js", "c.js"]);
}

#[test]
fn test_fixture_code_strips_front_matter() {
    let fixture = fixture("dir/name.js", "", "var x = 1;");
    assert_eq!(fixture.name(), "name");
    assert!(!fixture.code().contains("description"));
    assert!(fixture.code().contains("var x = 1;"));
}
