//! Payment gateway adapters.
//!
//! - `CardRailAdapter` - payment intents confirmed client-side (`client_secret`)
//! - `RedirectCheckoutAdapter` - hosted pages (`checkout_url` / `redirect_url`)
//! - `MobileMoneyAdapter` - messaging-channel collections (`payment_links` / `payment_url`)
//! - `PaymentLinkAdapter` - shareable links (`payment_url`)
//! - `GatewayRegistry` - resolves tenant settings to one of the above
//! - `MockGatewayAdapter` / `MockGatewayResolver` - in-process doubles for tests

mod card_rail;
mod client;
mod mobile_money;
mod mock_gateway;
mod payment_link;
mod redirect_checkout;
mod registry;

pub use card_rail::CardRailAdapter;
pub use client::{GatewayClient, ProcessorCredentials, ProcessorEndpoint};
pub use mobile_money::MobileMoneyAdapter;
pub use mock_gateway::{MockGatewayAdapter, MockGatewayResolver, RecordedCharge, MOCK_SIGNATURE_HEADER};
pub use payment_link::PaymentLinkAdapter;
pub use redirect_checkout::RedirectCheckoutAdapter;
pub use registry::{GatewayEndpoints, GatewayRegistry, ModeUrls};
