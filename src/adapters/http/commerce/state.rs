//! Shared application state for the commerce routes.

use std::sync::Arc;

use crate::application::handlers::{
    CalculateProrationHandler, ChangePlanHandler, CheckoutHandler, ConfigureGatewayHandler,
    CreateOrderHandler, CreatePaymentHandler, GetOrderHandler, HandleGatewayWebhookHandler,
    ListGatewaysHandler, ManageSubscriptionHandler, PaymentAttempts, PaymentSettings,
    RetryPaymentHandler, SetDefaultGatewayHandler, StartTrialHandler, TransitionOrderHandler,
};
use crate::domain::reconciliation::ReconcilePolicy;
use crate::ports::{
    CommissionCalculator, CredentialCipher, EventPublisher, GatewayResolver,
    GatewaySettingRepository, OrderRepository, PaymentLedger, ProductCatalog,
    SubscriptionRepository,
};

/// Arc-wrapped ports plus policy knobs; cloned into every request.
#[derive(Clone)]
pub struct CommerceAppState {
    pub orders: Arc<dyn OrderRepository>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub gateway_settings: Arc<dyn GatewaySettingRepository>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub gateways: Arc<dyn GatewayResolver>,
    pub commission: Arc<dyn CommissionCalculator>,
    pub cipher: Arc<dyn CredentialCipher>,
    pub events: Arc<dyn EventPublisher>,
    pub payment: PaymentSettings,
    pub reconcile_policy: ReconcilePolicy,
}

impl CommerceAppState {
    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.catalog.clone(),
            self.orders.clone(),
            self.subscriptions.clone(),
        )
    }

    fn payment_attempts(&self) -> Arc<PaymentAttempts> {
        Arc::new(PaymentAttempts::new(
            self.orders.clone(),
            self.ledger.clone(),
            self.gateways.clone(),
            self.commission.clone(),
            self.payment.clone(),
        ))
    }

    pub fn checkout_handler(&self) -> CheckoutHandler {
        CheckoutHandler::new(Arc::new(self.create_order_handler()), self.payment_attempts())
    }

    pub fn create_payment_handler(&self) -> CreatePaymentHandler {
        CreatePaymentHandler::new(self.payment_attempts())
    }

    pub fn retry_payment_handler(&self) -> RetryPaymentHandler {
        RetryPaymentHandler::new(self.payment_attempts())
    }

    pub fn get_order_handler(&self) -> GetOrderHandler {
        GetOrderHandler::new(self.orders.clone(), self.ledger.clone())
    }

    pub fn transition_order_handler(&self) -> TransitionOrderHandler {
        TransitionOrderHandler::new(self.orders.clone(), self.events.clone())
    }

    pub fn manage_subscription_handler(&self) -> ManageSubscriptionHandler {
        ManageSubscriptionHandler::new(self.subscriptions.clone(), self.events.clone())
    }

    pub fn change_plan_handler(&self) -> ChangePlanHandler {
        ChangePlanHandler::new(self.catalog.clone(), self.subscriptions.clone())
    }

    pub fn proration_handler(&self) -> CalculateProrationHandler {
        CalculateProrationHandler::new(self.catalog.clone(), self.subscriptions.clone())
    }

    pub fn start_trial_handler(&self) -> StartTrialHandler {
        StartTrialHandler::new(self.catalog.clone(), self.subscriptions.clone())
    }

    pub fn configure_gateway_handler(&self) -> ConfigureGatewayHandler {
        ConfigureGatewayHandler::new(self.gateway_settings.clone(), self.cipher.clone())
    }

    pub fn list_gateways_handler(&self) -> ListGatewaysHandler {
        ListGatewaysHandler::new(self.gateway_settings.clone())
    }

    pub fn set_default_gateway_handler(&self) -> SetDefaultGatewayHandler {
        SetDefaultGatewayHandler::new(self.gateway_settings.clone())
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.gateways.clone(),
            self.ledger.clone(),
            self.events.clone(),
            self.reconcile_policy,
        )
    }
}
