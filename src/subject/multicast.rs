//! Multicast dispatcher: the state machine and fan-out core behind
//! [`Subject`](crate::subject::Subject).
//!
//! One dispatcher arbitrates between a single serialized producer and any
//! number of observers subscribing concurrently from any thread. The
//! observer set is an immutable snapshot replaced wholesale on every
//! subscribe, which is what lets value delivery iterate it without holding
//! the lock.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc, Mutex,
};

use super::attached::AttachedObserver;
use crate::subscription::{CompositeSubscription, SubscriptionLike};

/// Terminal status of the broadcast.
///
/// Monotonic: once out of `Open` the mode never changes again, and the
/// error cause captured by `Errored` is immutable from then on.
enum Mode<Err> {
  Open,
  Completed,
  Errored(Err),
}

/// Immutable snapshot of the attached observer set.
///
/// Built only on subscribe, by copying the still-attached subset of the
/// previous snapshot and appending the newcomer. A published snapshot is
/// never mutated; detached handles are skipped at delivery time and fall
/// out by exclusion from the next rebuild.
pub(crate) struct ObserverSet<Item, Err> {
  observers: Vec<AttachedObserver<Item, Err>>,
}

impl<Item, Err> ObserverSet<Item, Err> {
  fn first(observer: AttachedObserver<Item, Err>) -> Self {
    ObserverSet { observers: vec![observer] }
  }

  fn with_attached(&self, observer: AttachedObserver<Item, Err>) -> Self {
    let mut observers = Vec::with_capacity(self.observers.len() + 1);
    observers.extend(self.observers.iter().filter(|o| o.is_attached()).cloned());
    observers.push(observer);
    ObserverSet { observers }
  }

  fn is_empty(&self) -> bool { self.observers.is_empty() }

  /// Deliver one value to every attached observer, in insertion order.
  ///
  /// The value is cloned for all recipients but the last, which receives it
  /// moved.
  fn deliver_value(&self, value: Item)
  where
    Item: Clone,
  {
    let mut iter = self.observers.iter().peekable();
    while let Some(observer) = iter.next() {
      if iter.peek().is_some() {
        observer.next(value.clone());
      } else {
        observer.next(value);
        break;
      }
    }
  }

  fn deliver_error(&self, err: Err)
  where
    Err: Clone,
  {
    let mut iter = self.observers.iter().peekable();
    while let Some(observer) = iter.next() {
      if iter.peek().is_some() {
        observer.error(err.clone());
      } else {
        observer.error(err);
        break;
      }
    }
  }

  fn deliver_complete(&self) {
    for observer in &self.observers {
      observer.complete();
    }
  }
}

struct DispatcherInner<Item, Err> {
  mode: Mode<Err>,
  /// Current published snapshot. `None` until the first observer attaches,
  /// and forever after termination: clearing it in the same critical
  /// section that flips `mode` is what guarantees a racing subscribe either
  /// lands in the notified snapshot or takes the terminal-replay branch.
  snapshot: Option<Arc<ObserverSet<Item, Err>>>,
}

/// The producer-facing and consumer-facing core shared by all handles of
/// one subject.
pub(crate) struct MulticastDispatcher<Item, Err> {
  /// Bumped exactly once per attach and once on termination, always while
  /// the lock is held. The delivery fast path reads it without the lock to
  /// decide whether its cached snapshot is still current.
  generation: AtomicUsize,
  inner: Mutex<DispatcherInner<Item, Err>>,
  /// Aggregate scope for this broadcaster and every subscription derived
  /// from it. Snapshots never reference the dispatcher back, so the
  /// subject and its snapshot chain release independently.
  lifetime: CompositeSubscription,
}

/// Producer-side cache of the last snapshot the delivery path observed.
///
/// Staleness is safe by construction: the worst case is that an observer
/// attached after the cached snapshot was taken misses an in-flight value.
pub(crate) struct DeliveryCache<Item, Err> {
  generation: usize,
  snapshot: Option<Arc<ObserverSet<Item, Err>>>,
}

impl<Item, Err> Default for DeliveryCache<Item, Err> {
  fn default() -> Self { DeliveryCache { generation: 0, snapshot: None } }
}

impl<Item, Err> Clone for DeliveryCache<Item, Err> {
  fn clone(&self) -> Self {
    DeliveryCache { generation: self.generation, snapshot: self.snapshot.clone() }
  }
}

impl<Item, Err> MulticastDispatcher<Item, Err> {
  pub(crate) fn new() -> Self { Self::with_lifetime(CompositeSubscription::new()) }

  pub(crate) fn with_lifetime(lifetime: CompositeSubscription) -> Self {
    MulticastDispatcher {
      generation: AtomicUsize::new(0),
      inner: Mutex::new(DispatcherInner { mode: Mode::Open, snapshot: None }),
      lifetime,
    }
  }

  pub(crate) fn lifetime(&self) -> &CompositeSubscription { &self.lifetime }

  /// Record `observer` as attached, or replay the terminal notification if
  /// the broadcast already ended.
  ///
  /// Callable from any thread, concurrently with delivery and with other
  /// attach calls. An attach is never lost: either the handle lands in the
  /// published snapshot, or it synchronously receives the one terminal
  /// notification.
  pub(crate) fn attach(&self, observer: AttachedObserver<Item, Err>)
  where
    Err: Clone,
  {
    let mut guard = self.inner.lock().unwrap();
    let inner = &mut *guard;
    match &inner.mode {
      Mode::Open => {
        if observer.is_attached() {
          let snapshot = match &inner.snapshot {
            Some(prev) => prev.with_attached(observer),
            None => ObserverSet::first(observer),
          };
          inner.snapshot = Some(Arc::new(snapshot));
          self.generation.fetch_add(1, Ordering::Release);
        }
      }
      Mode::Completed => {
        drop(guard);
        observer.complete();
      }
      Mode::Errored(err) => {
        let err = err.clone();
        drop(guard);
        observer.error(err);
      }
    }
  }

  /// Deliver one value to the current observer set.
  ///
  /// Lock-free unless an attach or termination happened since the caller's
  /// last delivery; then the lock is held just long enough to copy the
  /// generation and the snapshot pointer. Emitting after termination is a
  /// silent no-op: the snapshot slot was cleared when the mode flipped.
  pub(crate) fn emit(&self, value: Item, cache: &mut DeliveryCache<Item, Err>)
  where
    Item: Clone,
  {
    if cache.generation != self.generation.load(Ordering::Acquire) {
      let inner = self.inner.lock().unwrap();
      cache.generation = self.generation.load(Ordering::Relaxed);
      cache.snapshot = inner.snapshot.clone();
    }
    match &cache.snapshot {
      Some(snapshot) if !snapshot.is_empty() => snapshot.deliver_value(value),
      _ => {}
    }
  }

  /// Terminate the broadcast successfully. Idempotent: only the first
  /// terminal call is ever observed, even from a misbehaving producer.
  pub(crate) fn complete(&self) {
    let snapshot = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.mode, Mode::Open) {
        return;
      }
      inner.mode = Mode::Completed;
      self.generation.fetch_add(1, Ordering::Release);
      inner.snapshot.take()
    };
    // Observer callbacks run strictly after the lock is released; one of
    // them may re-enter this dispatcher.
    if let Some(snapshot) = snapshot {
      snapshot.deliver_complete();
    }
    self.lifetime.clone().unsubscribe();
  }

  /// Terminate the broadcast with `err`. Same idempotence and ordering as
  /// [`complete`](Self::complete).
  pub(crate) fn error(&self, err: Err)
  where
    Err: Clone,
  {
    let snapshot = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.mode, Mode::Open) {
        return;
      }
      inner.mode = Mode::Errored(err.clone());
      self.generation.fetch_add(1, Ordering::Release);
      inner.snapshot.take()
    };
    if let Some(snapshot) = snapshot {
      snapshot.deliver_error(err);
    }
    self.lifetime.clone().unsubscribe();
  }

  pub(crate) fn is_terminated(&self) -> bool {
    !matches!(self.inner.lock().unwrap().mode, Mode::Open)
  }

  /// Whether the current snapshot holds any observer. Diagnostics only: the
  /// answer is stale the moment the lock is released.
  pub(crate) fn has_observers(&self) -> bool {
    match &self.inner.lock().unwrap().snapshot {
      Some(snapshot) => snapshot.observers.iter().any(|o| o.is_attached()),
      None => false,
    }
  }
}
