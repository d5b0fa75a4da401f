//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Observable trait
pub use crate::observable::Observable;
// Observer trait and adapters
pub use crate::observer::{BoxedObserver, DynObserver, FnMutObserver, Observer, ObserverAll};
// Subject
pub use crate::subject::{Subject, SubjectObservable, SubjectSink, SubjectSubscription};
// Subscription
pub use crate::subscription::{CompositeSubscription, SubscriptionGuard, SubscriptionLike};
