mod broadcaster;
mod context;
mod handle;

pub use broadcaster::{Broadcaster, CallbackSubscriber, ChannelSubscriber, SUBSCRIPTION_BUFFER_SIZE, Subscriber, SubscriberId, Subscription};
pub use context::RunContext;
pub use handle::RunHandle;

/// Id of one run, equal to its execution record id.
pub type RunId = String;
