//! Who is acting on a subscription.

use crate::domain::foundation::BuyerId;
use crate::domain::subscription::{ProductSubscription, SubscriptionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionActor {
    /// Acts only on subscriptions they hold.
    Buyer(BuyerId),
    /// Tenant staff.
    Operator,
}

impl SubscriptionActor {
    /// Another buyer's subscription reads as missing.
    pub fn ensure_can_act_on(&self, subscription: &ProductSubscription) -> Result<(), SubscriptionError> {
        match self {
            SubscriptionActor::Buyer(buyer) if *buyer != subscription.buyer_id => {
                Err(SubscriptionError::NotFound(subscription.id))
            }
            _ => Ok(()),
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, SubscriptionActor::Operator)
    }
}
