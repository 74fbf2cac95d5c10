pub mod auth;
pub mod config;
pub mod live;
pub mod metrics;
pub mod payment;
pub mod sms;
pub mod status;
pub mod testing;
pub mod ticket;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator,
    OpenAuthenticator, Operator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig, SmsConfig, StripeConfig,
};
pub use live::{GuestSession, TicketFeed, TicketSubscription};
pub use payment::{
    IntentHandle, PaymentError, PaymentIntentService, PaymentProvider, StripeClient,
    WebhookAuth, WebhookOutcome, WebhookReconciler,
};
pub use sms::{SmsError, SmsReceipt, SmsSender, TwilioSender};
pub use status::{is_terminal, phase_index, Phase, StatusView};
pub use ticket::{
    CreateJobRequest, CreateTicketRequest, CreateVehicleRequest, Job, PaymentConfig,
    PaymentTransaction, SqliteTicketStore, Ticket, TicketError, TicketRequestHandler,
    TicketStatus, TicketStore, Vehicle,
};
