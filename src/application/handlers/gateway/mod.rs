//! Gateway administration handlers.

mod configure_gateway;
mod list_gateways;
mod set_default_gateway;

pub use configure_gateway::{ConfigureGatewayCommand, ConfigureGatewayHandler};
pub use list_gateways::ListGatewaysHandler;
pub use set_default_gateway::{SetDefaultGatewayCommand, SetDefaultGatewayHandler};
