//! Subscription lifecycle handlers.

mod actor;
mod change_plan;
mod manage_subscription;
mod start_trial;
mod sweep;

pub use actor::SubscriptionActor;
pub use change_plan::{
    CalculateProrationHandler, CalculateProrationQuery, ChangePlanCommand, ChangePlanHandler,
    ChangePlanResult,
};
pub use manage_subscription::{
    ManageSubscriptionCommand, ManageSubscriptionHandler, SubscriptionAction,
};
pub use start_trial::{StartTrialCommand, StartTrialHandler};
pub use sweep::{SweepReport, SweepSubscriptionsHandler};
