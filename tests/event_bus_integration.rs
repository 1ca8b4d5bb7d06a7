use std::{
    collections::HashSet,
    sync::{mpsc, Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use syncra::{BusState, CancellationToken, EventBus, SyncError, Timeout};

/// Ждёт, пока у типа `T` появится обработчик.
fn wait_subscribed<T: 'static>(bus: &EventBus) {
    let started = Instant::now();
    while !bus.is_subscribed::<T>() {
        assert!(started.elapsed() < Duration::from_secs(5), "handler never subscribed");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Тест проверяет сценарий из документации: `max_pending = 5`, сто быстрых
/// публикаций строк; после остановки обработано от 5 до 100 сообщений, и ни
/// одно не обработано дважды.
#[test]
fn test_hundred_rapid_publishes_with_small_backlog() {
    let bus = Arc::new(EventBus::new(5).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (b, s) = (bus.clone(), seen.clone());
    let executor = thread::spawn(move || {
        b.subscribe::<String, _>(
            move |msg| {
                thread::sleep(Duration::from_micros(200));
                s.lock().unwrap().push(msg);
            },
            &CancellationToken::new(),
        )
    });
    wait_subscribed::<String>(&bus);

    for i in 0..100 {
        bus.publish(format!("message-{i}")).unwrap();
    }
    bus.shutdown().unwrap();
    executor.join().unwrap().unwrap();

    let seen = seen.lock().unwrap();
    assert!((5..=100).contains(&seen.len()), "processed {}", seen.len());
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), seen.len(), "a message was processed twice");

    let stats = bus.stats();
    assert_eq!(stats.published, 100);
    assert_eq!(stats.delivered + stats.dropped, 100);
    assert_eq!(stats.delivered as usize, seen.len());
}

/// Тест проверяет вытеснение при заблокированном обработчике:
/// `max_pending + 1` публикаций дают ровно `max_pending` доставок и одно
/// отброшенное сообщение.
#[test]
fn test_backpressure_with_blocked_handler() {
    const MAX_PENDING: usize = 3;
    let bus = Arc::new(EventBus::new(MAX_PENDING).unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (b, s) = (bus.clone(), seen.clone());
    let executor = thread::spawn(move || {
        let mut first = true;
        b.subscribe::<u32, _>(
            move |msg| {
                if first {
                    first = false;
                    let _ = release_rx.recv();
                }
                s.lock().unwrap().push(msg);
            },
            &CancellationToken::new(),
        )
    });
    wait_subscribed::<u32>(&bus);

    for i in 0..=MAX_PENDING as u32 {
        let started = Instant::now();
        bus.publish(i).unwrap();
        assert!(started.elapsed() < Duration::from_millis(100), "publish blocked");
    }
    assert_eq!(bus.stats().dropped, 1);

    release_tx.send(()).unwrap();
    bus.shutdown().unwrap();
    executor.join().unwrap().unwrap();

    assert_eq!(*seen.lock().unwrap(), (0..MAX_PENDING as u32).collect::<Vec<_>>());
    let stats = bus.stats();
    assert_eq!(stats.delivered, MAX_PENDING as u64);
    assert_eq!(stats.dropped, 1);
}

/// Тест проверяет, что обработчики разных типов работают независимо и
/// `shutdown` дожидается дренажа всех.
#[test]
fn test_independent_handlers_drain_on_shutdown() {
    let bus = Arc::new(EventBus::new(64).unwrap());
    let numbers = Arc::new(Mutex::new(Vec::new()));
    let words = Arc::new(Mutex::new(Vec::new()));

    let (b, n) = (bus.clone(), numbers.clone());
    let num_exec = thread::spawn(move || {
        b.subscribe::<i64, _>(move |v| n.lock().unwrap().push(v), &CancellationToken::new())
    });
    let (b, w) = (bus.clone(), words.clone());
    let word_exec = thread::spawn(move || {
        b.subscribe::<&'static str, _>(
            move |v| {
                thread::sleep(Duration::from_millis(1));
                w.lock().unwrap().push(v);
            },
            &CancellationToken::new(),
        )
    });
    wait_subscribed::<i64>(&bus);
    wait_subscribed::<&'static str>(&bus);

    for i in 0..20i64 {
        bus.publish(i).unwrap();
        bus.publish("tick").unwrap();
    }
    // Тип без обработчика молча игнорируется.
    bus.publish(1.5f64).unwrap();

    bus.shutdown().unwrap();
    assert_eq!(bus.state(), BusState::Terminated);
    num_exec.join().unwrap().unwrap();
    word_exec.join().unwrap().unwrap();

    assert_eq!(*numbers.lock().unwrap(), (0..20).collect::<Vec<_>>());
    assert_eq!(words.lock().unwrap().len(), 20);
    assert_eq!(bus.backlog_len::<i64>(), 0);
}

/// Тест проверяет, что `await_termination` в другом потоке возвращает
/// `true` после завершения остановки, а публикации после неё отклоняются.
#[test]
fn test_await_termination_and_publish_after_shutdown() {
    let bus = Arc::new(EventBus::new(8).unwrap());

    let b = bus.clone();
    let executor =
        thread::spawn(move || b.subscribe::<u8, _>(|_| {}, &CancellationToken::new()));
    wait_subscribed::<u8>(&bus);

    let b = bus.clone();
    let watcher =
        thread::spawn(move || b.await_termination(Timeout::Infinite, &CancellationToken::new()));

    bus.publish(1u8).unwrap();
    bus.shutdown().unwrap();

    assert_eq!(watcher.join().unwrap(), Ok(true));
    executor.join().unwrap().unwrap();

    let err = bus.publish(2u8).unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(bus.shutdown(), Err(SyncError::AlreadyShutDown));
}

/// Тест проверяет, что отмена подписки с непустой очередью отбрасывает
/// оставшиеся сообщения и учитывает их в статистике.
#[test]
fn test_cancel_with_backlog_discards_rest() {
    let bus = Arc::new(EventBus::new(16).unwrap());
    let cancel = CancellationToken::new();
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let (b, c) = (bus.clone(), cancel.clone());
    let executor = thread::spawn(move || {
        b.subscribe::<u16, _>(
            move |_| {
                let _ = entered_tx.send(());
                let _ = release_rx.recv();
            },
            &c,
        )
    });
    wait_subscribed::<u16>(&bus);

    for i in 0..5u16 {
        bus.publish(i).unwrap();
    }
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    cancel.cancel();
    release_tx.send(()).unwrap();

    assert_eq!(executor.join().unwrap(), Err(SyncError::Cancelled));
    let stats = bus.stats();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.dropped, 4);
    assert!(!bus.is_subscribed::<u16>());
}
