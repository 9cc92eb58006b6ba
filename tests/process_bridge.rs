//! Process bridge integration tests.
//!
//! These spawn real shell tools (`sort`, `cat`, `gzip`, `head`) and check
//! that output is complete, ordered and that children are reaped.

use pullseq::io::{read_lines, write_lines, Compression, WriteMode};
use pullseq::{SeqError, Sequence};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_sort_preserves_multiset() {
    let input: Vec<String> = (0..5000).map(|i| format!("{:05}", (i * 7919) % 5000)).collect();

    let (output, monitor) = Sequence::from_vec(input.clone())
        .pipe_monitored("sort")
        .unwrap();
    let sorted = output.to_list();

    let mut expected = input;
    expected.sort();
    assert_eq!(sorted, expected);
    assert!(monitor.is_terminated());
    assert!(monitor.exit_status().unwrap().success());
}

#[test]
fn test_cat_keeps_order() {
    let lines = Sequence::from_iter(0..1000).pipe("cat").unwrap().to_list();
    let expected: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_cat_streams_many_pipe_buffers() {
    // Far more than one OS pipe buffer in flight through a streaming tool.
    const N: u64 = 1_000_000;

    let mut count = 0u64;
    let mut sum = 0u64;
    for (i, line) in Sequence::from_iter(0..N).pipe("cat").unwrap().enumerate() {
        let value: u64 = line.parse().unwrap();
        assert_eq!(value, i as u64);
        count += 1;
        sum += value;
    }

    assert_eq!(count, N);
    assert_eq!(sum, N * (N - 1) / 2);
}

#[test]
fn test_chained_pipes() {
    let lines = Sequence::from_vec(vec!["b", "a", "c", "a"])
        .pipe("sort")
        .unwrap()
        .pipe("uniq")
        .unwrap()
        .to_list();
    assert_eq!(lines, vec!["a", "b", "c"]);
}

#[test]
fn test_consumer_stops_early() {
    // `yes` never finishes on its own; closing must kill and reap it.
    let start = Instant::now();
    let (output, monitor) = Sequence::<String>::empty()
        .pipe_monitored("yes pullseq")
        .unwrap();

    let first: Vec<String> = output.take(3).to_list();
    assert_eq!(first, vec!["pullseq"; 3]);
    assert!(monitor.is_terminated());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_child_stops_early() {
    // `head` exits before reading all input; the writer must not hang.
    let lines = Sequence::from_iter(0..200_000)
        .pipe("head -n 2")
        .unwrap()
        .to_list();
    assert_eq!(lines, vec!["0", "1"]);
}

#[test]
fn test_failing_command_yields_partial_output() {
    let (output, monitor) = Sequence::<String>::empty()
        .pipe_monitored("echo partial; exit 4")
        .unwrap();

    assert_eq!(output.to_list(), vec!["partial"]);
    assert_eq!(monitor.exit_status().unwrap().code(), Some(4));
}

#[test]
fn test_gzip_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers.txt.gz");

    let written = write_lines(
        Sequence::from_iter(1..=100),
        &path,
        WriteMode::Create,
        Compression::Gzip,
    )
    .unwrap();
    assert_eq!(written, 100);

    let total: u64 = read_lines(&path)
        .unwrap()
        .map(|line| line.parse::<u64>().unwrap())
        .to_list()
        .into_iter()
        .sum();
    assert_eq!(total, 5050);
}

#[test]
fn test_create_refuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.txt");

    write_lines(Sequence::once("a"), &path, WriteMode::Create, Compression::None).unwrap();
    let err = write_lines(Sequence::once("b"), &path, WriteMode::Create, Compression::None)
        .unwrap_err();
    assert!(matches!(err, SeqError::AlreadyExists(_)));

    write_lines(Sequence::once("b"), &path, WriteMode::Append, Compression::None).unwrap();
    assert_eq!(read_lines(&path).unwrap().to_list(), vec!["a", "b"]);
}
