//! The per-consumer handle stored in observer snapshots, and the
//! subscription that detaches it.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex,
};

use crate::{
  observer::{BoxedObserver, Observer},
  subscription::SubscriptionLike,
};

struct ObserverSlot<Item, Err> {
  /// Set once by `detach` (or a terminal delivery) and never cleared.
  /// Delivery checks it before touching the slot, and snapshot rebuilds
  /// filter on it.
  detached: AtomicBool,
  /// The observer itself. `None` after detach or a terminal delivery, and
  /// transiently while a value callback is running: the observer is taken
  /// out for the duration of each callback so no lock is held while
  /// consumer code runs. A consumer may cancel its own subscription, or
  /// subscribe another observer, from inside its own callback.
  slot: Mutex<Option<BoxedObserver<Item, Err>>>,
}

/// Shared handle to one attached observer.
///
/// Snapshots hold clones of this handle; it is never removed from a
/// published snapshot. Detaching flags the handle so every later delivery
/// skips it, and the next snapshot rebuild drops it by exclusion.
pub(crate) struct AttachedObserver<Item, Err>(Arc<ObserverSlot<Item, Err>>);

impl<Item, Err> Clone for AttachedObserver<Item, Err> {
  fn clone(&self) -> Self { AttachedObserver(self.0.clone()) }
}

impl<Item, Err> AttachedObserver<Item, Err> {
  /// Wrap `observer`. An observer that already reports closed is born
  /// detached and will never be recorded or notified.
  pub(crate) fn new(observer: BoxedObserver<Item, Err>) -> Self {
    let detached = observer.is_closed();
    AttachedObserver(Arc::new(ObserverSlot {
      detached: AtomicBool::new(detached),
      slot: Mutex::new((!detached).then_some(observer)),
    }))
  }

  pub(crate) fn is_attached(&self) -> bool { !self.0.detached.load(Ordering::Relaxed) }

  /// Mark the handle detached and drop the observer without any
  /// notification.
  pub(crate) fn detach(&self) {
    self.0.detached.store(true, Ordering::Relaxed);
    let observer = self.0.slot.lock().unwrap().take();
    // The observer's own drop runs after the slot lock is released; its
    // drop glue may re-enter this handle.
    drop(observer);
  }

  /// Deliver one value. Skipped entirely if the handle is detached.
  pub(crate) fn next(&self, value: Item) {
    if !self.is_attached() {
      return;
    }
    let Some(mut observer) = self.0.slot.lock().unwrap().take() else {
      return;
    };
    observer.next(value);
    if observer.is_closed() {
      // The consumer reported itself done; leave the handle detached so
      // the next snapshot rebuild prunes it.
      self.0.detached.store(true, Ordering::Relaxed);
      return;
    }
    let mut slot = self.0.slot.lock().unwrap();
    if self.is_attached() {
      *slot = Some(observer);
    }
  }

  /// Deliver the error terminating the stream. Consumes the observer; the
  /// handle is detached afterwards.
  pub(crate) fn error(&self, err: Err) {
    if let Some(observer) = self.take_for_terminal() {
      observer.error(err);
    }
  }

  /// Deliver completion. Consumes the observer; the handle is detached
  /// afterwards.
  pub(crate) fn complete(&self) {
    if let Some(observer) = self.take_for_terminal() {
      observer.complete();
    }
  }

  fn take_for_terminal(&self) -> Option<BoxedObserver<Item, Err>> {
    if !self.is_attached() {
      return None;
    }
    let taken = self.0.slot.lock().unwrap().take();
    self.0.detached.store(true, Ordering::Relaxed);
    taken
  }
}

/// Cancellation handle for a single subject subscription.
///
/// Unsubscribing detaches exactly this observer; the subject and its other
/// observers are untouched. The subject also registers this handle with its
/// aggregate scope, so tearing the subject down detaches it too.
pub struct SubjectSubscription<Item, Err> {
  handle: AttachedObserver<Item, Err>,
}

impl<Item, Err> SubjectSubscription<Item, Err> {
  pub(crate) fn new(handle: AttachedObserver<Item, Err>) -> Self { SubjectSubscription { handle } }
}

impl<Item, Err> Clone for SubjectSubscription<Item, Err> {
  fn clone(&self) -> Self { SubjectSubscription { handle: self.handle.clone() } }
}

impl<Item, Err> SubscriptionLike for SubjectSubscription<Item, Err> {
  #[inline]
  fn unsubscribe(&mut self) { self.handle.detach(); }

  #[inline]
  fn is_closed(&self) -> bool { !self.handle.is_attached() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::ObserverAll;

  fn collecting_handle(seen: &Arc<Mutex<Vec<i32>>>) -> AttachedObserver<i32, ()> {
    let c_seen = seen.clone();
    AttachedObserver::new(Box::new(ObserverAll::new(
      move |v| c_seen.lock().unwrap().push(v),
      |_: ()| {},
      || {},
    )))
  }

  #[test]
  fn delivers_while_attached() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = collecting_handle(&seen);

    handle.next(1);
    handle.next(2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    assert!(handle.is_attached());
  }

  #[test]
  fn detach_silences_the_handle() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = collecting_handle(&seen);

    handle.next(1);
    handle.detach();
    handle.next(2);
    handle.complete();

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert!(!handle.is_attached());
  }

  #[test]
  fn terminal_consumes_and_detaches() {
    let completed = Arc::new(Mutex::new(0));
    let c_completed = completed.clone();
    let handle: AttachedObserver<i32, ()> = AttachedObserver::new(Box::new(ObserverAll::new(
      |_| {},
      |_: ()| {},
      move || *c_completed.lock().unwrap() += 1,
    )));

    handle.complete();
    handle.complete();
    handle.next(1);

    assert_eq!(*completed.lock().unwrap(), 1);
    assert!(!handle.is_attached());
  }

  #[test]
  fn subscription_detaches_only_its_handle() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let first = collecting_handle(&seen);
    let second = collecting_handle(&seen);

    let mut sub = SubjectSubscription::new(first.clone());
    assert!(!sub.is_closed());
    sub.unsubscribe();
    assert!(sub.is_closed());
    assert!(!first.is_attached());
    assert!(second.is_attached());
  }

  #[test]
  fn self_closing_observer_is_pruned() {
    struct OneShot {
      fired: bool,
    }
    impl Observer<i32, ()> for OneShot {
      fn next(&mut self, _: i32) { self.fired = true; }

      fn error(self, _: ()) {}

      fn complete(self) {}

      fn is_closed(&self) -> bool { self.fired }
    }

    let handle: AttachedObserver<i32, ()> =
      AttachedObserver::new(Box::new(OneShot { fired: false }));
    assert!(handle.is_attached());
    handle.next(1);
    assert!(!handle.is_attached());
  }

  #[test]
  fn born_closed_observer_is_never_attached() {
    struct Closed;
    impl Observer<i32, ()> for Closed {
      fn next(&mut self, _: i32) {}

      fn error(self, _: ()) {}

      fn complete(self) {}

      fn is_closed(&self) -> bool { true }
    }

    let handle: AttachedObserver<i32, ()> = AttachedObserver::new(Box::new(Closed));
    assert!(!handle.is_attached());
    handle.next(1);
    handle.complete();
  }
}
