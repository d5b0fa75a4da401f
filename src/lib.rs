//! # hotcast: a hot multicast Subject for reactive streams
//!
//! A [`Subject`] is two things at once: a sink for one upstream producer
//! and a hot, shared source for any number of downstream observers joining
//! and leaving at any time, including after the producer already
//! terminated. Values fan out to the observer set that existed when
//! delivery started, termination reaches every attached observer exactly
//! once, and late subscribers get exactly the terminal notification and
//! nothing else. Nothing is buffered or replayed.
//!
//! ## Quick Start
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
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Subject`] | The hot broadcaster pairing a producer and a consumer side |
//! | [`SubjectSink`] | Producer handle, an [`Observer`] feeding the broadcast |
//! | [`SubjectObservable`] | Consumer-side source observers subscribe to |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` notifications |
//! | [`CompositeSubscription`] | Aggregate scope tearing down many subscriptions at once |
//!
//! [`Subject`]: subject::Subject
//! [`SubjectSink`]: subject::SubjectSink
//! [`SubjectObservable`]: subject::SubjectObservable
//! [`Observer`]: observer::Observer
//! [`CompositeSubscription`]: subscription::CompositeSubscription

pub mod observable;
pub mod observer;
pub mod prelude;
pub mod subject;
pub mod subscription;

pub use prelude::*;
