use flowcanvas_store::{LogFilter, LogStore, LogStoreConfig, NewLogEntry};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn holds_min_of_added_and_capacity_newest_first() {
    for (capacity, added) in [(1, 5), (5, 3), (10, 10), (7, 50)] {
        let logs = LogStore::init(LogStoreConfig { capacity });
        for i in 0..added {
            logs.add_log(NewLogEntry::info("test", i.to_string()));
        }
        let entries = logs.all();
        assert_eq!(entries.len(), added.min(capacity));
        let expected: Vec<String> = (0..added)
            .rev()
            .take(capacity)
            .map(|i| i.to_string())
            .collect();
        let actual: Vec<String> = entries.iter().map(|e| e.message.clone()).collect();
        assert_eq!(actual, expected);
        assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}

#[test]
fn concurrent_writers_notify_with_growing_sequences() {
    let logs = LogStore::init(LogStoreConfig { capacity: 1000 });
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lengths);
    logs.subscribe(move |entries| sink.lock().unwrap().push(entries.len()));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let logs = logs.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    logs.add_log(NewLogEntry::debug("worker", format!("{w}-{i}")));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let lengths = lengths.lock().unwrap();
    assert_eq!(lengths.len(), 100);
    assert_eq!(*lengths, (1..=100).collect::<Vec<_>>());
    assert_eq!(logs.get_logs(&LogFilter::default().category("worker")).len(), 100);
}
