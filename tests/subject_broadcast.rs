//! Integration tests for the hot multicast subject.
//!
//! Covers the broadcast contract end to end: hot delivery, exactly-once
//! termination, terminal replay for late subscribers, detach behavior, and
//! the threaded attach-while-emitting races the core exists to survive.

use std::{
  convert::Infallible,
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

use hotcast::prelude::*;

#[derive(Clone, Debug, PartialEq)]
enum Event {
  Value(usize),
  Error(&'static str),
  Completed,
}

type Log = Arc<Mutex<Vec<Event>>>;

fn recording(
  subject: &Subject<usize, &'static str>,
) -> (Log, SubjectSubscription<usize, &'static str>) {
  let log: Log = Arc::new(Mutex::new(Vec::new()));
  let (v_log, e_log, c_log) = (log.clone(), log.clone(), log.clone());
  let sub = subject.observable().subscribe_all(
    move |v| v_log.lock().unwrap().push(Event::Value(v)),
    move |e| e_log.lock().unwrap().push(Event::Error(e)),
    move || c_log.lock().unwrap().push(Event::Completed),
  );
  (log, sub)
}

#[test]
fn detached_observer_misses_later_values_and_terminal() {
  let subject = Subject::new();
  let mut sink = subject.sink();

  let (a, mut a_sub) = recording(&subject);
  let (b, _b_sub) = recording(&subject);

  sink.next(1);
  sink.next(2);
  a_sub.unsubscribe();
  sink.next(3);
  sink.complete();

  assert_eq!(*a.lock().unwrap(), vec![Event::Value(1), Event::Value(2)]);
  assert_eq!(
    *b.lock().unwrap(),
    vec![Event::Value(1), Event::Value(2), Event::Value(3), Event::Completed]
  );
}

#[test]
fn completion_with_no_observers_then_late_attach() {
  let subject = Subject::new();
  subject.sink().complete();

  let (c, c_sub) = recording(&subject);
  assert_eq!(*c.lock().unwrap(), vec![Event::Completed]);
  assert!(c_sub.is_closed());
}

#[test]
fn late_attach_after_error_replays_the_cause() {
  let subject = Subject::new();
  let mut sink = subject.sink();
  sink.next(1);
  subject.sink().error("boom");

  let (c, _sub) = recording(&subject);
  assert_eq!(*c.lock().unwrap(), vec![Event::Error("boom")]);
}

#[test]
fn double_termination_keeps_only_the_first() {
  let subject = Subject::new();
  let (log, _sub) = recording(&subject);

  subject.sink().complete();
  subject.sink().error("late");
  subject.sink().complete();

  assert_eq!(*log.lock().unwrap(), vec![Event::Completed]);

  let reversed = Subject::new();
  let (r_log, _r_sub) = recording(&reversed);

  reversed.sink().error("first");
  reversed.sink().complete();
  reversed.sink().error("second");

  assert_eq!(*r_log.lock().unwrap(), vec![Event::Error("first")]);
}

#[test]
fn values_after_termination_are_noops() {
  let subject = Subject::new();
  let mut sink = subject.sink();
  let (log, _sub) = recording(&subject);

  sink.next(1);
  subject.sink().complete();
  sink.next(2);
  sink.next(3);

  assert_eq!(*log.lock().unwrap(), vec![Event::Value(1), Event::Completed]);

  // A fresh subscriber after termination sees the replayed terminal and
  // stays silent for the stray values too.
  let (late, _late_sub) = recording(&subject);
  sink.next(4);
  assert_eq!(*late.lock().unwrap(), vec![Event::Completed]);
}

#[test]
fn raii_guard_detaches_on_drop() {
  let subject = Subject::<usize, &'static str>::new();
  let mut sink = subject.sink();
  let (log, sub) = recording(&subject);

  {
    let _guard = SubscriptionGuard::new(sub);
    sink.next(1);
  }
  sink.next(2);

  assert_eq!(*log.lock().unwrap(), vec![Event::Value(1)]);
}

#[test]
fn error_reaches_a_racing_subscriber_exactly_once() {
  for _ in 0..50 {
    let subject = Subject::<usize, &'static str>::new();

    let attacher = {
      let subject = subject.clone();
      thread::spawn(move || {
        let (log, _sub) = recording(&subject);
        // Either the subscriber was in the pre-error snapshot or it took
        // the replay path; both must deliver the cause exactly once.
        loop {
          let events = log.lock().unwrap().clone();
          if !events.is_empty() {
            return events;
          }
          thread::yield_now();
        }
      })
    };

    let producer = {
      let subject = subject.clone();
      thread::spawn(move || subject.sink().error("boom"))
    };

    producer.join().unwrap();
    let events = attacher.join().unwrap();
    assert_eq!(events, vec![Event::Error("boom")]);
  }
}

#[test]
fn attaching_while_emitting_yields_contiguous_suffixes() {
  const VALUES: usize = 500;
  const CONSUMERS: usize = 16;

  let subject = Subject::<usize, &'static str>::new();
  let logs: Vec<Log> = (0..CONSUMERS).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();

  let attacher = {
    let subject = subject.clone();
    let logs = logs.clone();
    thread::spawn(move || {
      for log in logs {
        let (v_log, e_log, c_log) = (log.clone(), log.clone(), log);
        subject.observable().subscribe_all(
          move |v| v_log.lock().unwrap().push(Event::Value(v)),
          move |e| e_log.lock().unwrap().push(Event::Error(e)),
          move || c_log.lock().unwrap().push(Event::Completed),
        );
        thread::sleep(Duration::from_micros(200));
      }
    })
  };

  let producer = {
    let subject = subject.clone();
    thread::spawn(move || {
      let mut sink = subject.sink();
      for v in 0..VALUES {
        sink.next(v);
      }
      sink.complete();
    })
  };

  producer.join().unwrap();
  attacher.join().unwrap();

  for log in &logs {
    let events = log.lock().unwrap().clone();
    let values: Vec<usize> = events
      .iter()
      .filter_map(|e| match e {
        Event::Value(v) => Some(*v),
        _ => None,
      })
      .collect();
    let terminals = events.len() - values.len();

    // Exactly one terminal per consumer, live or replayed, and it comes
    // last.
    assert_eq!(terminals, 1);
    assert_eq!(events.last(), Some(&Event::Completed));

    // A consumer sees a contiguous run of values ending at the final one:
    // everything emitted after its attach completed, nothing from the
    // past, no duplicates.
    for pair in values.windows(2) {
      assert_eq!(pair[1], pair[0] + 1);
    }
    if let Some(&last) = values.last() {
      assert_eq!(last, VALUES - 1);
    }
  }
}

#[test]
fn concurrent_subscribers_all_receive_later_values() {
  let subject = Subject::<usize, &'static str>::new();

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let subject = subject.clone();
      thread::spawn(move || recording(&subject))
    })
    .collect();
  let subs: Vec<(Log, _)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

  let mut sink = subject.sink();
  sink.next(7);
  sink.complete();

  for (log, _sub) in &subs {
    assert_eq!(*log.lock().unwrap(), vec![Event::Value(7), Event::Completed]);
  }
}

#[test]
fn infallible_subject_with_plain_subscribe() {
  let subject = Subject::<usize, Infallible>::new();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let c_seen = seen.clone();

  subject.observable().subscribe(move |v| c_seen.lock().unwrap().push(v));

  let mut sink = subject.sink();
  for v in 0..4 {
    sink.next(v);
  }

  assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
}
