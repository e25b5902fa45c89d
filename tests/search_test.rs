use qry::{content_snippet, search, search_streaming, Query, SearchMode, SearchResult, SortBy};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// hello.py, readme.md, big.bin, sub/{deep.txt,notes.py}, plus excluded noise.
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("hello.py"), "# hello world\ndef search(): pass\n").unwrap();
    fs::write(root.join("readme.md"), "# Readme\nThis is a test project.\n").unwrap();
    fs::write(root.join("big.bin"), vec![0u8; 2048]).unwrap();

    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(
        root.join("sub/deep.txt"),
        "deep file content with search keyword\n",
    )
    .unwrap();
    fs::write(root.join("sub/notes.py"), "x = 1\n").unwrap();

    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "[core]\n").unwrap();
    fs::create_dir_all(root.join("__pycache__")).unwrap();
    fs::write(root.join("__pycache__/mod.cpython-313.pyc"), vec![0u8; 100]).unwrap();
    dir
}

fn run(query: &Query, root: &Path) -> Vec<SearchResult> {
    search(query, &[root]).unwrap()
}

fn names(results: &[SearchResult], root: &Path) -> Vec<String> {
    let mut names: Vec<String> = results
        .iter()
        .map(|r| {
            r.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    names.sort();
    names
}

#[test]
fn test_filename_search() {
    let dir = sample_tree();
    let results = run(&Query::new("hello"), dir.path());
    assert_eq!(names(&results, dir.path()), vec!["hello.py"]);
    let result = &results[0];
    assert_eq!(result.extension, "py");
    assert_eq!(result.content_type, "text/x-python");
    assert_eq!(result.score, 1.0);
}

#[test]
fn test_filename_results_contain_query() {
    let dir = sample_tree();
    for result in run(&Query::new("NOTES"), dir.path()) {
        assert!(result.path.to_string_lossy().to_lowercase().contains("notes"));
    }
}

#[test]
fn test_content_search() {
    let dir = sample_tree();
    let results = run(&Query::new("search keyword").mode(SearchMode::Content), dir.path());
    assert_eq!(names(&results, dir.path()), vec!["sub/deep.txt"]);
}

#[test]
fn test_content_mode_ignores_file_names() {
    let dir = sample_tree();
    let results = run(&Query::new("notes").mode(SearchMode::Content), dir.path());
    assert!(results.is_empty());
}

#[test]
fn test_both_is_union_of_name_and_content() {
    let dir = sample_tree();
    let query = Query::new("notes or search keyword");
    let by_name = names(&run(&query.clone().mode(SearchMode::Filename), dir.path()), dir.path());
    let by_content = names(&run(&query.clone().mode(SearchMode::Content), dir.path()), dir.path());
    let both = names(&run(&query.mode(SearchMode::Both), dir.path()), dir.path());

    let mut union: Vec<String> = by_name.into_iter().chain(by_content).collect();
    union.sort();
    union.dedup();
    assert_eq!(both, union);
    assert_eq!(both, vec!["sub/deep.txt", "sub/notes.py"]);
}

#[test]
fn test_depth_zero_stays_in_root() {
    let dir = sample_tree();
    let results = run(&Query::new("").max_depth(0), dir.path());
    assert_eq!(
        names(&results, dir.path()),
        vec!["big.bin", "hello.py", "readme.md"]
    );
}

#[test]
fn test_file_types() {
    let dir = sample_tree();
    let results = run(&Query::new("").file_types(["py"]), dir.path());
    assert_eq!(names(&results, dir.path()), vec!["hello.py", "sub/notes.py"]);
}

#[test]
fn test_default_exclusions() {
    let dir = sample_tree();
    let all = names(&run(&Query::new(""), dir.path()), dir.path());
    assert!(all.iter().all(|n| !n.starts_with(".git/")));
    assert!(all.iter().all(|n| !n.starts_with("__pycache__/")));
    assert_eq!(all.len(), 5);
}

#[test]
fn test_empty_exclusion_list_descends_everywhere() {
    let dir = sample_tree();
    let query = Query::new("config").exclude_dirs(Vec::<String>::new());
    assert_eq!(names(&run(&query, dir.path()), dir.path()), vec![".git/config"]);
    let all = run(&Query::new("").exclude_dirs(Vec::<String>::new()), dir.path());
    assert_eq!(all.len(), 7);
}

#[test]
fn test_size_bounds() {
    let dir = sample_tree();
    let large = run(&Query::new("").min_size(1000), dir.path());
    assert_eq!(names(&large, dir.path()), vec!["big.bin"]);

    let small = run(&Query::new("").max_size(100), dir.path());
    assert!(small.iter().all(|r| r.size <= 100));
    assert!(!names(&small, dir.path()).contains(&"big.bin".to_string()));
}

#[test]
fn test_regex_filename() {
    let dir = sample_tree();
    let results = run(&Query::new(r"\.py$").regex(true), dir.path());
    assert_eq!(names(&results, dir.path()), vec!["hello.py", "sub/notes.py"]);
}

#[test]
fn test_regex_content() {
    let dir = sample_tree();
    let query = Query::new(r"def \w+\(\)").regex(true).mode(SearchMode::Content);
    assert_eq!(names(&run(&query, dir.path()), dir.path()), vec!["hello.py"]);
}

#[test]
fn test_sort_by_name() {
    let dir = sample_tree();
    let results = run(&Query::new("").sort_by(SortBy::Name), dir.path());
    let paths: Vec<String> = results
        .iter()
        .map(|r| r.path.to_string_lossy().to_lowercase())
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn test_sort_by_size() {
    let dir = sample_tree();
    let results = run(&Query::new("").sort_by(SortBy::Size), dir.path());
    assert!(results.windows(2).all(|w| w[0].size <= w[1].size));
    assert_eq!(results.last().map(|r| r.size), Some(2048));
}

#[test]
fn test_or_query_is_superset() {
    let dir = sample_tree();
    let single = names(&run(&Query::new("hello"), dir.path()), dir.path());
    let either = names(&run(&Query::new("hello OR readme"), dir.path()), dir.path());
    assert!(single.iter().all(|n| either.contains(n)));
    assert_eq!(either, vec!["hello.py", "readme.md"]);
}

#[test]
fn test_max_results_caps_output() {
    let dir = sample_tree();
    assert_eq!(run(&Query::new("").max_results(2), dir.path()).len(), 2);
    assert!(run(&Query::new("").max_results(0), dir.path()).is_empty());
}

#[test]
fn test_streaming_matches_collected_search() {
    let dir = sample_tree();
    let query = Query::new("").mode(SearchMode::Both);
    let streamed: Vec<SearchResult> = search_streaming(&query, &[dir.path()]).unwrap().collect();
    assert_eq!(
        names(&streamed, dir.path()),
        names(&run(&query, dir.path()), dir.path())
    );
}

#[test]
fn test_missing_and_file_roots() {
    let dir = sample_tree();
    let missing = dir.path().join("nope");
    assert!(search(&Query::new(""), &[&missing]).unwrap().is_empty());

    let file = dir.path().join("hello.py");
    let results = search(&Query::new("hello"), &[&file]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, file);
}

#[test]
fn test_multiple_roots() {
    let dir = sample_tree();
    let roots: Vec<PathBuf> = vec![dir.path().join("sub"), dir.path().join("hello.py")];
    let results = search(&Query::new(".py"), &roots).unwrap();
    assert_eq!(names(&results, dir.path()), vec!["hello.py", "sub/notes.py"]);
}

#[test]
fn test_binary_content_type() {
    let dir = sample_tree();
    let results = run(&Query::new("big"), dir.path());
    assert_eq!(results[0].content_type, "application/octet-stream");
}

#[test]
fn test_content_snippet() {
    let dir = sample_tree();
    let hello = dir.path().join("hello.py");

    let snippet = content_snippet(&hello, "search", 1, false).unwrap();
    assert!(snippet.contains("def search(): pass"));
    assert!(snippet.contains("# hello world"));

    let snippet = content_snippet(&hello, r"def \w+", 0, true).unwrap();
    assert!(snippet.starts_with('>'));

    assert!(content_snippet(&hello, "nonexistent_xyz_42", 1, false).is_none());
}
