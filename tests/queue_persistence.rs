use std::collections::VecDeque;

use proptest::prelude::*;
use tempfile::TempDir;

use trails::persist::{QueueError, RecordQueue, sqlite::SqliteQueue};

#[test]
fn queue_survives_reopen_in_order() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("queue.db");

    {
        let mut queue = SqliteQueue::open(&db_path).expect("open sqlite");
        assert_eq!(queue.append("A").expect("append"), 0);
        assert_eq!(queue.append("B").expect("append"), 1);
        assert_eq!(queue.append("C").expect("append"), 2);
        assert_eq!(queue.remove_first().expect("remove"), 0);
    }

    let mut queue = SqliteQueue::open(&db_path).expect("reopen sqlite");
    assert_eq!(queue.count().expect("count"), 2);
    let pending: Vec<_> = queue
        .pending()
        .expect("pending")
        .into_iter()
        .map(|r| (r.key, r.payload))
        .collect();
    assert_eq!(pending, vec![(1, "B".to_string()), (2, "C".to_string())]);

    // keys keep counting from where the previous process stopped
    assert_eq!(queue.append("D").expect("append"), 3);
    assert_eq!(queue.peek_first().expect("peek").payload, "B");
}

#[test]
fn empty_queue_reports_empty() {
    let mut queue = SqliteQueue::open_in_memory().expect("open sqlite");
    assert!(matches!(queue.peek_first(), Err(QueueError::Empty)));
    assert!(matches!(queue.remove_first(), Err(QueueError::Empty)));
    assert_eq!(queue.count().expect("count"), 0);

    queue.append("only").expect("append");
    queue.remove_first().expect("remove");
    assert!(matches!(queue.remove_first(), Err(QueueError::Empty)));
    assert_eq!(queue.count().expect("count"), 0);
}

#[test]
fn drain_yields_fifo_order() {
    let mut queue = SqliteQueue::open_in_memory().expect("open sqlite");
    for payload in ["A", "B", "C"] {
        queue.append(payload).expect("append");
    }

    let mut seen = Vec::new();
    let mut count = queue.count().expect("count");
    while let Ok(record) = queue.peek_first() {
        seen.push(record.payload);
        queue.remove_first().expect("remove");
        let next = queue.count().expect("count");
        assert_eq!(next + 1, count);
        count = next;
    }
    assert_eq!(seen, vec!["A", "B", "C"]);
}

#[derive(Debug, Clone)]
enum Action {
    Append(String),
    Remove,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => "[a-z{}\"0-9]{0,12}".prop_map(Action::Append),
        2 => Just(Action::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn queue_matches_vecdeque_model(actions in prop::collection::vec(action_strategy(), 1..60)) {
        let mut queue = SqliteQueue::open_in_memory().expect("open sqlite");
        let mut model: VecDeque<(u64, String)> = VecDeque::new();
        let mut next_key = 0u64;

        for action in actions {
            match action {
                Action::Append(payload) => {
                    let key = queue.append(&payload).expect("append");
                    prop_assert_eq!(key, next_key);
                    model.push_back((key, payload));
                    next_key += 1;
                }
                Action::Remove => match model.pop_front() {
                    Some((key, _)) => prop_assert_eq!(queue.remove_first().expect("remove"), key),
                    None => prop_assert!(matches!(queue.remove_first(), Err(QueueError::Empty))),
                },
            }

            prop_assert_eq!(queue.count().expect("count"), model.len() as u64);
            match model.front() {
                Some((key, payload)) => {
                    let head = queue.peek_first().expect("peek");
                    prop_assert_eq!(head.key, *key);
                    prop_assert_eq!(&head.payload, payload);
                }
                None => prop_assert!(matches!(queue.peek_first(), Err(QueueError::Empty))),
            }
        }
    }
}
