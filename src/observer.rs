//! Observer trait and implementations
//!
//! The Observer trait defines the consumer side of a broadcast. It receives
//! values, an error, or a completion notification from the source it is
//! attached to.

use std::convert::Infallible;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer: the consumer of notifications in reactive programming.
///
/// Notification grammar: `next* (error | complete)?`. After a terminal call
/// the source never touches the observer again, which is why `error` and
/// `complete` consume `self`.
pub trait Observer<Item, Err> {
  /// Receive the next value from the source.
  fn next(&mut self, value: Item);

  /// Receive the error that terminates the stream.
  fn error(self, err: Err);

  /// Receive the successful completion of the stream.
  fn complete(self);

  /// Whether this observer stopped accepting notifications.
  ///
  /// Sources use this to skip delivery to observers that are done and to
  /// prune them from their bookkeeping.
  fn is_closed(&self) -> bool;
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Object-safe mirror of [`Observer`].
///
/// `Observer` is not object-safe because the terminal methods take `self` by
/// value; this trait mirrors the interface but adapts it for vtables.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }

  fn box_error(self: Box<Self>, err: Err) { self.error(err); }

  fn box_complete(self: Box<Self>) { self.complete(); }

  fn box_is_closed(&self) -> bool { self.is_closed() }
}

/// Boxed observer as stored in a subject's observer set.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Observer built from a single `next` closure.
///
/// This enables the ergonomic subscription syntax
/// `observable.subscribe(|v| ...)` for sources that cannot fail: the closure
/// becomes the `next` handler, completion is ignored.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value); }

  #[inline]
  fn error(self, _err: Infallible) {}

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Observer built from `next`, `error` and `complete` closures.
///
/// The terminal closures are `FnOnce`: at most one of them runs, at most
/// once.
#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> ObserverAll<N, E, C> {
  #[inline]
  pub fn new(next: N, error: E, complete: C) -> Self { ObserverAll { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value); }

  #[inline]
  fn error(self, err: Err) { (self.error)(err); }

  #[inline]
  fn complete(self) { (self.complete)(); }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  struct TestObserver {
    values: Vec<i32>,
  }

  impl Observer<i32, ()> for TestObserver {
    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(self, _: ()) {}

    fn complete(self) {}

    fn is_closed(&self) -> bool { false }
  }

  #[test]
  fn observer_trait() {
    let mut obs = TestObserver { values: vec![] };
    obs.next(1);
    obs.next(2);
    assert_eq!(obs.values, vec![1, 2]);
    assert!(!obs.is_closed());
  }

  #[test]
  fn closure_as_observer() {
    let mut count = 0;
    let mut obs = FnMutObserver(|v: i32| {
      count += v;
    });

    obs.next(10);
    obs.next(20);
    assert_eq!(count, 30);
  }

  #[test]
  fn boxed_observer_delegates() {
    let mut boxed: BoxedObserver<i32, ()> = Box::new(TestObserver { values: vec![] });
    boxed.next(1);
    assert!(!boxed.is_closed());
    boxed.complete();
  }

  #[test]
  fn observer_all_terminal_runs_once() {
    let mut completed = false;
    let obs = ObserverAll::new(|_: i32| {}, |_: ()| {}, || completed = true);
    obs.complete();
    assert!(completed);
  }
}
