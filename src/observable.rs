//! Observable boundary: the subscribe operation.

use std::convert::Infallible;

use crate::{
  observer::{FnMutObserver, Observer, ObserverAll},
  subscription::SubscriptionLike,
};

/// A subscribable source of values.
///
/// Subscribing hands an [`Observer`] to the source and returns the handle
/// that cancels this one subscription.
pub trait Observable {
  type Item;
  type Err;

  /// The subscription type returned from subscribing.
  type Unsub: SubscriptionLike;

  /// Invoke an execution of this source and register `observer` for the
  /// notifications it will deliver.
  fn subscribe_with<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;

  /// Subscribe with a `next` closure only. Available when the source cannot
  /// fail; completion is ignored.
  fn subscribe<N>(self, next: N) -> Self::Unsub
  where
    Self: Observable<Err = Infallible> + Sized,
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_with(FnMutObserver(next))
  }

  /// Subscribe with handlers for all three notification kinds.
  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> Self::Unsub
  where
    Self: Sized,
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe_with(ObserverAll::new(next, error, complete))
  }
}
