//! Notification hub for HeroProxy.
//!
//! Change events produced by the refresh scheduler and the search
//! coordinator fan out here to long-lived subscribers. Subscribers register
//! either for specific hero IDs or as wildcards receiving every event; each
//! subscriber owns one bounded delivery channel with FIFO ordering.
//!
//! Delivery failures are the hub's problem, never the publisher's: a closed
//! or stalled subscriber is cancelled and unregistered without affecting
//! delivery to anyone else.

pub mod hub;
pub mod subscription;

pub use hub::NotificationHub;
pub use subscription::{Scope, SubscriptionHandle, SubscriptionState};
