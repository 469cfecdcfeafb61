pub mod event;
pub mod queue;
pub mod router;
pub mod subscriptions;

pub use event::{EnvironmentEvent, EventHandlers, MessageHandler, SendStatus};
pub use queue::MessageQueue;
pub use router::MessageRouter;
pub use subscriptions::{Subscription, SubscriptionTable};
