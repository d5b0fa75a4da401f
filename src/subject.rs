//! Subject: a hot broadcaster that multicasts values to many observers.
//!
//! A [`Subject`] pairs two narrow handles over one shared dispatcher: a
//! producer-side [`SubjectSink`] that accepts one producer's notifications,
//! and a consumer-side [`SubjectObservable`] that any number of observers
//! subscribe to, at any time, from any thread.
//!
//! # Semantics
//!
//! - **Hot, no replay.** An observer receives only the values delivered
//!   after its subscribe completed. Past values are never buffered.
//! - **Exactly-once termination.** Every observer attached when the
//!   broadcast terminates receives exactly one terminal notification and
//!   nothing afterwards. An observer subscribing after termination
//!   synchronously receives exactly that terminal notification.
//! - **Snapshot delivery.** The observer set is an immutable snapshot
//!   rebuilt on every subscribe. Steady-state delivery compares a cached
//!   generation counter and takes no lock at all; the lock is only touched
//!   when the set changed since the last delivery.
//! - **Callbacks outside the lock.** No internal lock is held while an
//!   observer runs, so an observer may cancel its own subscription or
//!   subscribe another observer from inside its own callback. An observer
//!   subscribing from inside a callback does not receive the value
//!   currently in flight.
//!
//! # Contract
//!
//! Producer notifications must be serialized: never call two of
//! `next`/`error`/`complete` concurrently on the same subject. The `&mut`
//! receiver on the sink's `next` enforces this for a single handle.
//! Subscribe and unsubscribe calls are free to race with the producer and
//! with each other.
//!
//! # Example
//!
//! ```rust
//! use std::{
//!   convert::Infallible,
//!   sync::{Arc, Mutex},
//! };
//!
//! use hotcast::prelude::*;
//!
//! let subject = Subject::<i32, Infallible>::new();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let c_seen = seen.clone();
//! subject.observable().subscribe(move |v| c_seen.lock().unwrap().push(v));
//!
//! let mut sink = subject.sink();
//! sink.next(1);
//! sink.next(2);
//! sink.complete();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```

mod attached;
mod multicast;

use std::sync::Arc;

use attached::AttachedObserver;
pub use attached::SubjectSubscription;
use multicast::{DeliveryCache, MulticastDispatcher};

use crate::{observable::Observable, observer::Observer, subscription::CompositeSubscription};

/// A hot multicast broadcaster.
///
/// The subject itself is a thin, cloneable pairing layer: it owns no
/// observer list of its own, it only hands out producer and consumer
/// handles onto the shared dispatcher.
pub struct Subject<Item, Err> {
  dispatcher: Arc<MulticastDispatcher<Item, Err>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { dispatcher: self.dispatcher.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Subject { dispatcher: Arc::new(MulticastDispatcher::new()) } }

  /// Create a subject whose aggregate lifetime is `lifetime`: triggering
  /// that scope detaches every observer, exactly like termination does,
  /// without delivering any terminal notification.
  pub fn with_lifetime(lifetime: CompositeSubscription) -> Self {
    Subject { dispatcher: Arc::new(MulticastDispatcher::with_lifetime(lifetime)) }
  }

  /// The producer handle. Feed it one producer's notifications; they fan
  /// out to every observer attached at that moment.
  pub fn sink(&self) -> SubjectSink<Item, Err> {
    SubjectSink { dispatcher: self.dispatcher.clone(), cache: DeliveryCache::default() }
  }

  /// The consumer-side source. Each call returns a fresh handle onto the
  /// same broadcast; subscribing to any of them attaches to this subject.
  pub fn observable(&self) -> SubjectObservable<Item, Err> {
    SubjectObservable { dispatcher: self.dispatcher.clone() }
  }

  /// Whether any observer is currently attached.
  ///
  /// Diagnostics only: the answer may be stale by the time it is read and
  /// must not be used for correctness decisions.
  pub fn has_observers(&self) -> bool { self.dispatcher.has_observers() }

  /// Whether the broadcast has completed or errored.
  pub fn is_terminated(&self) -> bool { self.dispatcher.is_terminated() }

  /// The aggregate cancellation scope of this subject and every
  /// subscription derived from it. Unsubscribing it detaches all observers
  /// and releases the producer-side resources.
  pub fn subscription(&self) -> CompositeSubscription { self.dispatcher.lifetime().clone() }
}

/// Producer handle of a [`Subject`].
///
/// Carries the delivery cache, so steady-state `next` calls touch no lock.
/// A cloned sink starts from the shared dispatcher state and refreshes its
/// own cache on first use.
pub struct SubjectSink<Item, Err> {
  dispatcher: Arc<MulticastDispatcher<Item, Err>>,
  cache: DeliveryCache<Item, Err>,
}

impl<Item, Err> Clone for SubjectSink<Item, Err> {
  fn clone(&self) -> Self {
    SubjectSink { dispatcher: self.dispatcher.clone(), cache: self.cache.clone() }
  }
}

impl<Item, Err> Observer<Item, Err> for SubjectSink<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) { self.dispatcher.emit(value, &mut self.cache); }

  fn error(self, err: Err) { self.dispatcher.error(err); }

  fn complete(self) { self.dispatcher.complete(); }

  fn is_closed(&self) -> bool { self.dispatcher.is_terminated() }
}

/// Consumer-side source of a [`Subject`].
pub struct SubjectObservable<Item, Err> {
  dispatcher: Arc<MulticastDispatcher<Item, Err>>,
}

impl<Item, Err> Clone for SubjectObservable<Item, Err> {
  fn clone(&self) -> Self { SubjectObservable { dispatcher: self.dispatcher.clone() } }
}

impl<Item, Err> Observable for SubjectObservable<Item, Err>
where
  Item: 'static,
  Err: Clone + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SubjectSubscription<Item, Err>;

  fn subscribe_with<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let handle = AttachedObserver::new(Box::new(observer));
    let subscription = SubjectSubscription::new(handle.clone());
    // Attach first: if the broadcast already terminated this replays the
    // terminal notification; registering with an already-closed scope
    // afterwards just detaches the spent handle again.
    self.dispatcher.attach(handle);
    self.dispatcher.lifetime().add(subscription.clone());
    subscription
  }
}
