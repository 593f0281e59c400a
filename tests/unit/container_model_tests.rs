//! Unit tests for container record parsing and status classification.

use compose_pilot::models::{classify_status, ContainerRecord, ContainerState};

#[test]
fn documented_engine_line_parses() {
    let record = ContainerRecord::parse_line("web_1|myimage:1.0|Up 2 minutes|myproject|2 minutes")
        .expect("five-field line must parse");
    assert_eq!(record.name, "web_1");
    assert_eq!(record.image, "myimage:1.0");
    assert_eq!(record.status, "Up 2 minutes");
    assert_eq!(record.project, "myproject");
    assert_eq!(record.uptime.as_deref(), Some("2 minutes"));
    assert!(record.is_running());
}

#[test]
fn four_field_line_parses_without_uptime() {
    let record = ContainerRecord::parse_line("db_1|postgres:16|Exited (0) 5 minutes ago|stack")
        .expect("four-field line must parse");
    assert_eq!(record.project, "stack");
    assert_eq!(record.uptime, None);
    assert!(!record.is_running());
}

#[test]
fn empty_trailing_uptime_field_is_none() {
    let record =
        ContainerRecord::parse_line("a|b|Up 1 second|p|").expect("five-field line must parse");
    assert_eq!(record.uptime, None);
}

#[test]
fn short_lines_are_skipped() {
    assert_eq!(ContainerRecord::parse_line(""), None);
    assert_eq!(ContainerRecord::parse_line("just-a-name"), None);
    assert_eq!(ContainerRecord::parse_line("a|b|c"), None);
}

#[test]
fn unlabeled_container_has_empty_project() {
    let record = ContainerRecord::parse_line("lone|img:1|Up 3 days|")
        .expect("line with empty project must parse");
    assert_eq!(record.project, "");
}

#[test]
fn status_classification() {
    assert_eq!(classify_status("Up 2 minutes"), ContainerState::Running);
    assert_eq!(classify_status("Up 2 minutes (healthy)"), ContainerState::Running);
    assert_eq!(
        classify_status("Exited (137) 2 hours ago"),
        ContainerState::Stopped
    );
    assert_eq!(classify_status("Created"), ContainerState::Other);
    assert_eq!(classify_status("Restarting (1) 2 seconds ago"), ContainerState::Other);
    assert_eq!(classify_status(""), ContainerState::Other);
}
