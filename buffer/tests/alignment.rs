//! End-to-end alignment of concurrently produced streams.

use std::thread;
use std::time::{Duration, Instant};

use timesync_buffer::{AllMatch, BufferConfig, SynchronizedBuffer, TimedBuffer};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stream 0 carries questions, stream 1 the answers, produced with gaps.
#[test]
fn test_question_answer_streams() {
    init_tracing();

    let buf = SynchronizedBuffer::<(String, i32)>::with_config(
        &BufferConfig::default()
            .with_capacity(5)
            .with_timeout(Duration::from_millis(50)),
    );
    let producer = buf.clone();

    let handle = thread::spawn(move || {
        producer.push_force::<0>(0, "1+1=".to_string());
        thread::sleep(Duration::from_millis(100));

        producer.push_force::<0>(1, "2+1=".to_string());
        thread::sleep(Duration::from_millis(50));

        producer.push_force::<1>(1, 3);
        thread::sleep(Duration::from_millis(50));

        producer.push_force::<0>(2, "2+3=".to_string());
        thread::sleep(Duration::from_millis(50));

        producer.push_force::<1>(2, 5);
        thread::sleep(Duration::from_millis(50));

        producer.push_force::<0>(3, "4+3=".to_string());
        thread::sleep(Duration::from_millis(50));

        producer.push_force::<1>(3, 7);
    });

    let mut waits = 0;
    let (ts, (question, answer)) = loop {
        match buf.pop_available() {
            Ok(reading) => break reading,
            Err(err) => {
                assert!(err.is_timeout());
                waits += 1;
            }
        }
    };
    // Stream 1 never had anything at 0
    assert_eq!(ts, 1);
    assert_eq!(question, "2+1=");
    assert_eq!(answer, 3);
    assert!(waits > 0, "first reading is only available after 150ms");

    let (question, answer) = loop {
        if let Ok(values) = buf.pop_by_timestamp(AllMatch, 3) {
            break values;
        }
    };
    assert_eq!(question, "4+3=");
    assert_eq!(answer, 7);

    handle.join().unwrap();
    assert!(buf.is_empty());
}

#[test]
fn test_pinned_timeout_keeps_backlog() {
    init_tracing();

    let buf = SynchronizedBuffer::<(u32, u32)>::new();
    buf.push_force::<0>(10, 1);
    buf.push_force::<0>(11, 2);
    buf.push_force::<1>(10, 3);

    let start = Instant::now();
    let err = buf
        .pop_by_timestamp_timeout(AllMatch, 11, Duration::from_millis(30))
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(buf.len::<0>(), 2);
    assert_eq!(buf.len::<1>(), 1);

    // The backlog is still alignable
    assert_eq!(buf.pop_available_timeout(Duration::ZERO).unwrap(), (10, (1, 3)));
}

#[test]
fn test_many_producers_one_consumer() {
    init_tracing();

    let buf = SynchronizedBuffer::<(u64, u64, u64)>::with_config(
        &BufferConfig::default().with_capacity(64),
    );

    let a = buf.clone();
    let b = buf.clone();
    let c = buf.clone();
    let producers = vec![
        thread::spawn(move || {
            for ts in 0..20u64 {
                a.push_force::<0>(ts, ts);
                thread::sleep(Duration::from_millis(1));
            }
        }),
        thread::spawn(move || {
            for ts in 0..20u64 {
                b.push_force::<1>(ts, ts * 2);
                thread::sleep(Duration::from_millis(2));
            }
        }),
        thread::spawn(move || {
            // Only even timestamps on this stream
            for ts in (0..20u64).step_by(2) {
                c.push_force::<2>(ts, ts * 3);
                thread::sleep(Duration::from_millis(3));
            }
        }),
    ];

    let mut seen = Vec::new();
    while seen.last().is_none_or(|&ts| ts < 18) {
        let (ts, (x, y, z)) = match buf.pop_available_timeout(Duration::from_secs(5)) {
            Ok(reading) => reading,
            Err(err) => panic!("streams never aligned: {}", err),
        };
        assert_eq!((x, y, z), (ts, ts * 2, ts * 3));
        seen.push(ts);
    }

    for handle in producers {
        handle.join().unwrap();
    }
    assert!(seen.iter().all(|ts| ts % 2 == 0));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_timed_buffer_reader_follows_writer() {
    init_tracing();

    let buf = TimedBuffer::<String>::new(16);
    let writer = buf.clone();

    let handle = thread::spawn(move || {
        for ts in 0..10u64 {
            writer.push_force(ts, format!("sample {}", ts));
            thread::sleep(Duration::from_millis(2));
        }
    });

    // A pinned read waits for the writer to catch up
    let (ts, value) = buf.get_by_timestamp(Duration::from_secs(5), 6).unwrap();
    assert_eq!(ts, 6);
    assert_eq!(value, "sample 6");

    let (ts, _) = buf.pop_by_timestamp(Duration::from_secs(5), 9).unwrap();
    assert_eq!(ts, 9);

    handle.join().unwrap();
    assert!(buf.is_empty());
}
