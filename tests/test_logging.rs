use patch_upscaler::logging::{self, log_error, log_message};

#[test]
fn init_routes_lines_to_the_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upscaler.log");
    logging::init(Some(&path));
    // later calls are ignored
    logging::init(None);

    log_message("first line");
    log_error("second line");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("] first line"));
    assert!(lines[1].ends_with("] ERROR: second line"));
}
