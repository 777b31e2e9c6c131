use go_test_report::metadata::{read_listings, MetadataQuery, PackageListing, StaticListings};
use go_test_report::resolver::{LocationResolver, ResolveError, SourceLocation, AD_HOC_GROUP};
use go_test_report::source::{FunctionDecl, GoSourceParser, SourceParser};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct FakeQuery {
    listings: HashMap<String, PackageListing>,
    calls: Mutex<Vec<String>>,
}

impl FakeQuery {
    fn with(mut self, target: &str, dir: &str, files: &[&str]) -> Self {
        self.listings.insert(
            target.to_string(),
            PackageListing {
                dir: PathBuf::from(dir),
                import_path: target.to_string(),
                test_files: files.iter().map(|f| f.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }
}

impl MetadataQuery for FakeQuery {
    fn describe(&self, target: &str) -> Result<PackageListing, ResolveError> {
        self.calls.lock().unwrap().push(target.to_string());
        self.listings.get(target).cloned().ok_or_else(|| ResolveError::Query {
            group: target.to_string(),
            reason: "exit status: 1".into(),
        })
    }
}

#[derive(Default)]
struct FakeParser {
    files: HashMap<PathBuf, Vec<FunctionDecl>>,
}

impl FakeParser {
    fn with(mut self, path: &str, funcs: &[(&str, usize, usize)]) -> Self {
        self.files.insert(
            PathBuf::from(path),
            funcs
                .iter()
                .map(|&(name, line, column)| FunctionDecl { name: name.into(), line, column })
                .collect(),
        );
        self
    }
}

impl SourceParser for FakeParser {
    fn functions(&self, path: &Path) -> Result<Vec<FunctionDecl>, ResolveError> {
        self.files.get(path).cloned().ok_or_else(|| ResolveError::Parse { path: path.to_path_buf() })
    }
}

fn groups(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn resolves_every_group_into_the_index() {
    let query = FakeQuery::default()
        .with("pkgA", "/src/a", &["a_test.go"])
        .with("pkgB", "/src/b", &["b_test.go", "more_test.go"]);
    let parser = FakeParser::default()
        .with("/src/a/a_test.go", &[("TestOne", 10, 1)])
        .with("/src/b/b_test.go", &[("TestTwo", 5, 1), ("helper", 20, 1)])
        .with("/src/b/more_test.go", &[("TestThree", 7, 2)]);

    let index = LocationResolver::new(&query, &parser).resolve(&groups(&["pkgA", "pkgB"])).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(
        index.lookup("pkgA", "TestOne"),
        Some(&SourceLocation { file: "a_test.go".into(), line: 10, column: 1 })
    );
    assert_eq!(
        index.lookup("pkgB", "TestThree"),
        Some(&SourceLocation { file: "more_test.go".into(), line: 7, column: 2 })
    );
    assert!(index.lookup("pkgA", "TestTwo").is_none());
    assert!(index.lookup("pkgC", "TestOne").is_none());
}

#[test]
fn one_failed_query_fails_the_whole_resolution() {
    let query = FakeQuery::default()
        .with("pkgA", "/src/a", &["a_test.go"])
        .with("pkgC", "/src/c", &["c_test.go"]);
    let parser = FakeParser::default()
        .with("/src/a/a_test.go", &[("TestOne", 1, 1)])
        .with("/src/c/c_test.go", &[("TestC", 1, 1)]);

    let err = LocationResolver::new(&query, &parser)
        .resolve(&groups(&["pkgA", "pkgB", "pkgC"]))
        .unwrap_err();
    match err {
        ResolveError::Query { group, .. } => assert_eq!(group, "pkgB"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn one_failed_parse_fails_the_whole_resolution() {
    let query = FakeQuery::default().with("pkgA", "/src/a", &["a_test.go", "broken_test.go"]);
    let parser = FakeParser::default().with("/src/a/a_test.go", &[("TestOne", 1, 1)]);

    let err = LocationResolver::new(&query, &parser).resolve(&groups(&["pkgA"])).unwrap_err();
    assert!(matches!(err, ResolveError::Parse { ref path } if path == Path::new("/src/a/broken_test.go")));
}

#[test]
fn ad_hoc_group_is_left_unresolved_without_a_target() {
    let query = FakeQuery::default().with("pkgA", "/src/a", &[]);
    let parser = FakeParser::default();

    let index = LocationResolver::new(&query, &parser)
        .resolve(&groups(&["pkgA", AD_HOC_GROUP]))
        .unwrap();
    assert!(index.contains_group("pkgA"));
    assert!(!index.contains_group(AD_HOC_GROUP));
    assert_eq!(*query.calls.lock().unwrap(), vec!["pkgA".to_string()]);
}

#[test]
fn ad_hoc_group_uses_the_fallback_target() {
    let query = FakeQuery::default().with("./cmd/tool", "/src/tool", &["tool_test.go"]);
    let parser = FakeParser::default().with("/src/tool/tool_test.go", &[("TestTool", 3, 1)]);

    let index = LocationResolver::new(&query, &parser)
        .with_ad_hoc_target(Some("./cmd/tool".into()))
        .resolve(&groups(&[AD_HOC_GROUP]))
        .unwrap();
    assert_eq!(index.lookup(AD_HOC_GROUP, "TestTool").map(|l| l.line), Some(3));
    assert!(!index.contains_group("./cmd/tool"));
}

#[test]
fn listing_stream_is_indexed_by_import_path() {
    let stream = r#"{"Dir":"/src/a","ImportPath":"example.com/a","Name":"a","TestGoFiles":["a_test.go"]}
{
  "Dir": "/src/b",
  "ImportPath": "example.com/b",
  "Name": "b",
  "XTestGoFiles": ["b_ext_test.go"]
}"#;
    let listings = read_listings(stream.as_bytes()).unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[1].xtest_files, vec!["b_ext_test.go"]);

    let query = StaticListings::new(listings);
    let parser = FakeParser::default()
        .with("/src/a/a_test.go", &[("TestA", 4, 1)])
        .with("/src/b/b_ext_test.go", &[("TestB", 8, 1)]);
    let index = LocationResolver::new(&query, &parser).resolve_listings(query.listings()).unwrap();
    assert_eq!(index.lookup("example.com/a", "TestA").map(|l| l.line), Some(4));
    assert_eq!(index.lookup("example.com/b", "TestB").map(|l| l.file.as_str()), Some("b_ext_test.go"));

    assert!(query.describe("example.com/missing").is_err());
}

#[test]
fn go_sources_are_parsed_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("calc_test.go"),
        "package calc\n\nimport \"testing\"\n\nfunc TestAdd(t *testing.T) {\n\tif 1+1 != 2 {\n\t\tt.Fatal(\"math\")\n\t}\n}\n\nfunc TestSub(t *testing.T) {}\n",
    )
    .unwrap();
    let query = FakeQuery::default().with("calc", dir.path().to_str().unwrap(), &["calc_test.go"]);

    let index = LocationResolver::new(&query, &GoSourceParser).resolve(&groups(&["calc"])).unwrap();
    assert_eq!(
        index.lookup("calc", "TestAdd"),
        Some(&SourceLocation { file: "calc_test.go".into(), line: 5, column: 1 })
    );
    assert_eq!(index.lookup("calc", "TestSub").map(|l| l.line), Some(11));
}

#[test]
fn unreadable_go_source_is_a_read_error() {
    let query = FakeQuery::default().with("gone", "/definitely/not/here", &["x_test.go"]);
    let err = LocationResolver::new(&query, &GoSourceParser).resolve(&groups(&["gone"])).unwrap_err();
    assert!(matches!(err, ResolveError::Read { .. }));
}
