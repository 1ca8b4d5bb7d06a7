use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use proptest::prelude::*;
use syncra::{CancellationToken, MessageQueue, SendState, Timeout};

const PRODUCERS: usize = 4;
const CONSUMERS: usize = 4;
const PER_PRODUCER: usize = 250;

/// Тест проверяет, что при конкурентных отправителях и получателях каждое
/// сообщение получено ровно один раз и все дескрипторы в `Delivered`.
#[test]
fn test_concurrent_exactly_once() {
    let queue = Arc::new(MessageQueue::<usize>::new());
    let barrier = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));
    let total = PRODUCERS * PER_PRODUCER;
    let received = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let (queue, barrier) = (queue.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                (0..PER_PRODUCER)
                    .map(|i| queue.send(p * PER_PRODUCER + i))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let (queue, barrier, received) = (queue.clone(), barrier.clone(), received.clone());
            thread::spawn(move || {
                barrier.wait();
                let cancel = CancellationToken::new();
                let mut got = Vec::new();
                while received.load(Ordering::SeqCst) < total {
                    if let Some(v) = queue.receive(Duration::from_millis(20), &cancel).unwrap() {
                        received.fetch_add(1, Ordering::SeqCst);
                        got.push(v);
                    }
                }
                got
            })
        })
        .collect();

    let handles: Vec<_> = producers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let mut seen = HashSet::new();
    for c in consumers {
        for v in c.join().unwrap() {
            assert!(seen.insert(v), "message {v} received twice");
        }
    }

    assert_eq!(seen.len(), total);
    assert!(handles.iter().all(|h| h.state() == SendState::Delivered));
    assert!(queue.is_empty());
    assert_eq!(queue.waiting_receivers(), 0);
}

/// Тест проверяет, что отправитель, ждущий доставки, и получатель
/// встречаются, а отменённое до получения сообщение не доставляется.
#[test]
fn test_try_cancel_races_with_receive() {
    for _ in 0..100 {
        let queue = Arc::new(MessageQueue::<u8>::new());
        let handle = queue.send(1);

        let q = queue.clone();
        let receiver = thread::spawn(move || q.receive(Timeout::ZERO, &CancellationToken::new()));
        let cancelled = handle.try_cancel();
        let received = receiver.join().unwrap().unwrap();

        // Ровно одна сторона выигрывает.
        assert_ne!(cancelled, received.is_some());
        assert_eq!(handle.is_delivered(), received.is_some());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// Свойство: последовательность отправок и получений с нулевым
    /// таймаутом ведёт себя как FIFO-очередь, а отменённые сообщения
    /// выпадают из неё.
    #[test]
    fn prop_fifo_with_cancellations(ops in prop::collection::vec((any::<u16>(), any::<bool>(), any::<bool>()), 1..64)) {
        let queue = MessageQueue::new();
        let cancel = CancellationToken::new();
        let mut model = std::collections::VecDeque::new();
        let mut handles = Vec::new();

        for (value, cancel_it, receive_after) in ops {
            let handle = queue.send(value);
            if cancel_it {
                prop_assert!(handle.try_cancel());
            } else {
                model.push_back(value);
            }
            handles.push(handle);

            if receive_after {
                let got = queue.receive(Timeout::ZERO, &cancel).unwrap();
                prop_assert_eq!(got, model.pop_front());
            }
        }

        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(queue.receive(Timeout::ZERO, &cancel).unwrap(), Some(expected));
        }
        prop_assert_eq!(queue.receive(Timeout::ZERO, &cancel).unwrap(), None);
        prop_assert!(handles.iter().all(|h| h.state() != SendState::Queued));
    }
}
