//! Subscription handles and the composite cancellation scope.

use std::{
  any::Any,
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex},
};

use smallvec::SmallVec;

/// Handle returned from subscribing that allows deregistering from a stream
/// before it has finished delivering all events.
pub trait SubscriptionLike {
  /// Cancel the subscription. Idempotent: calls after the first are no-ops.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

/// Aggregate cancellation scope: a set of child subscriptions torn down
/// together.
///
/// Clones share one scope. Unsubscribing it closes the scope permanently and
/// unsubscribes every registered child; children added afterwards are
/// unsubscribed on the spot.
#[derive(Clone, Debug, Default)]
pub struct CompositeSubscription(Arc<Mutex<Inner>>);

type BoxTearDown = Box<dyn SubscriptionLike + Send + Sync>;

struct Inner {
  closed: bool,
  teardown: SmallVec<[BoxTearDown; 1]>,
}

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  /// Register `child` so it is unsubscribed together with this scope.
  ///
  /// Already-closed children are pruned on the way in. Adding a scope to
  /// itself is a no-op.
  pub fn add<S: SubscriptionLike + Send + Sync + 'static>(&self, child: S) {
    if !self.is_same(&child) {
      self.0.lock().unwrap().add(Box::new(child));
    }
  }

  /// Number of registered children, for diagnostics.
  pub fn teardown_size(&self) -> usize { self.0.lock().unwrap().teardown.len() }

  fn is_same(&self, other: &dyn Any) -> bool {
    if let Some(other) = other.downcast_ref::<Self>() {
      Arc::ptr_eq(&self.0, &other.0)
    } else {
      false
    }
  }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&mut self) {
    // Children are torn down outside the scope's own lock; a child's
    // teardown may re-enter this scope.
    let teardown = {
      let mut inner = self.0.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for mut child in teardown {
      child.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.lock().unwrap().closed }
}

impl Inner {
  fn add(&mut self, mut child: BoxTearDown) {
    if self.closed {
      child.unsubscribe();
    } else {
      self.teardown.retain(|c| !c.is_closed());
      self.teardown.push(child);
    }
  }
}

impl Default for Inner {
  fn default() -> Self { Inner { closed: false, teardown: SmallVec::new() } }
}

impl Debug for Inner {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Inner")
      .field("closed", &self.closed)
      .field("teardown_count", &self.teardown.len())
      .finish()
  }
}

/// An RAII "scoped subscription": when this guard is dropped the wrapped
/// subscription is unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wrap an existing subscription to enable RAII behavior for it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> SubscriptionLike for SubscriptionGuard<T> {
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
