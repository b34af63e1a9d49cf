use chrono::Utc;
use std::fs;
use std::path::Path;
use threatgen::sender::FileSender;
use threatgen::{DestinationConfig, Fields, GeneratedEvent, Sender};

/// 64 KiB payload; sixteen of them (plus newlines) cross the 1 MiB threshold.
const PAYLOAD: usize = 64 * 1024;
const EVENTS_PER_FILE: usize = 16;

fn big_event(seq: usize) -> GeneratedEvent {
    let marker = format!("event-{seq:05} ");
    let raw = format!("{marker}{}", "x".repeat(PAYLOAD - marker.len()));
    GeneratedEvent::new("test", "bulk", Utc::now(), raw, Fields::new(), "test")
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
}

fn rotating_sender(path: &Path, keep: usize) -> FileSender {
    let mut config = DestinationConfig::file(path);
    config.max_size_mb = 1;
    config.rotate_keep = keep;
    FileSender::new(&config).unwrap()
}

#[test]
fn test_rotation_past_threshold_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    let sender = rotating_sender(&path, 2);

    let total = EVENTS_PER_FILE * 2 + 1;
    for seq in 0..total {
        sender.send(&big_event(seq)).unwrap();
    }
    sender.close().unwrap();

    assert!(path.exists());
    assert!(sender.rotated_path(1).exists());
    assert!(sender.rotated_path(2).exists());
    assert!(!sender.rotated_path(3).exists());

    let counts = [
        line_count(&path),
        line_count(&sender.rotated_path(1)),
        line_count(&sender.rotated_path(2)),
    ];
    assert_eq!(counts, [1, EVENTS_PER_FILE, EVENTS_PER_FILE]);
    assert_eq!(counts.iter().sum::<usize>(), total);
}

#[test]
fn test_oldest_backlog_dropped_after_keep_plus_one_rotations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    let sender = rotating_sender(&path, 2);

    for seq in 0..EVENTS_PER_FILE * 3 + 1 {
        sender.send(&big_event(seq)).unwrap();
    }
    sender.close().unwrap();

    assert!(!sender.rotated_path(3).exists());
    let oldest = fs::read_to_string(sender.rotated_path(2)).unwrap();
    assert!(!oldest.contains("event-00000 "));
    assert!(oldest.starts_with(&format!("event-{EVENTS_PER_FILE:05} ")));
}

#[test]
fn test_rotation_tolerates_missing_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    let sender = rotating_sender(&path, 5);

    for seq in 0..EVENTS_PER_FILE * 2 + 1 {
        sender.send(&big_event(seq)).unwrap();
    }
    // .1 and .2 exist; .3 through .5 never did
    fs::remove_file(sender.rotated_path(1)).unwrap();
    for seq in 0..EVENTS_PER_FILE {
        sender.send(&big_event(seq)).unwrap();
    }
    sender.close().unwrap();

    assert!(sender.rotated_path(1).exists());
    assert!(!sender.rotated_path(2).exists());
    assert!(sender.rotated_path(3).exists());
}

#[test]
fn test_zero_max_size_never_rotates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    let mut config = DestinationConfig::file(&path);
    config.max_size_mb = 0;
    let sender = FileSender::new(&config).unwrap();

    for seq in 0..EVENTS_PER_FILE + 2 {
        sender.send(&big_event(seq)).unwrap();
    }
    sender.close().unwrap();

    assert!(!sender.rotated_path(1).exists());
    assert_eq!(line_count(&path), EVENTS_PER_FILE + 2);
}

#[test]
fn test_concurrent_senders_keep_lines_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    let sender = rotating_sender(&path, 3);

    std::thread::scope(|scope| {
        for t in 0..4 {
            let sender = &sender;
            scope.spawn(move || {
                for i in 0..10 {
                    sender.send(&big_event(t * 100 + i)).unwrap();
                }
            });
        }
    });
    sender.close().unwrap();

    let mut total = 0;
    for file in [path.clone(), sender.rotated_path(1), sender.rotated_path(2)] {
        if let Ok(content) = fs::read_to_string(&file) {
            for line in content.lines() {
                assert_eq!(line.len(), PAYLOAD);
                assert!(line.starts_with("event-"));
                total += 1;
            }
        }
    }
    assert_eq!(total, 40);
}
