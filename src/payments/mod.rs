pub mod gateway_client;

pub use gateway_client::{
    GatewayPayment, GatewayPaymentStatus, GatewayPreference, MercadoPagoClient, PaymentGateway,
};
