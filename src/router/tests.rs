use super::Router;

#[test]
fn test_root_path() {
    let (re, params) = Router::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = Router::path_to_regex("/v2/user/{username}").unwrap();
    assert!(re.is_match("/v2/user/user1"));
    assert!(!re.is_match("/v2/user/user1/extra"));
    assert!(!re.is_match("/v2/user"));
    assert!(!re.is_match("/v2/user/"));
    assert_eq!(params, vec!["username"]);
}

#[test]
fn test_nested_path() {
    let (re, params) = Router::path_to_regex("/a/{b}/c").unwrap();
    assert!(re.is_match("/a/1/c"));
    assert!(!re.is_match("/a/1/d"));
    assert_eq!(params, vec!["b"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = Router::path_to_regex("/files/report.json").unwrap();
    assert!(re.is_match("/files/report.json"));
    assert!(!re.is_match("/files/reportxjson"));
}

#[test]
fn test_trailing_slash_is_significant() {
    let (re, _) = Router::path_to_regex("/user/").unwrap();
    assert!(re.is_match("/user/"));
    assert!(!re.is_match("/user"));
}
