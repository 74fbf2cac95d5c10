use std::sync::Arc;

use valet_core::{
    Authenticator, Config, PaymentIntentService, SanitizedConfig, SmsSender, TicketFeed,
    TicketRequestHandler, TicketStore, WebhookReconciler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    ticket_store: Arc<dyn TicketStore>,
    feed: TicketFeed,
    intents: PaymentIntentService,
    reconciler: WebhookReconciler,
    requests: TicketRequestHandler,
    sms: Option<Arc<dyn SmsSender>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        ticket_store: Arc<dyn TicketStore>,
        feed: TicketFeed,
        intents: PaymentIntentService,
        reconciler: WebhookReconciler,
        requests: TicketRequestHandler,
        sms: Option<Arc<dyn SmsSender>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            ticket_store,
            feed,
            intents,
            reconciler,
            requests,
            sms,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    pub fn feed(&self) -> &TicketFeed {
        &self.feed
    }

    pub fn intents(&self) -> &PaymentIntentService {
        &self.intents
    }

    pub fn reconciler(&self) -> &WebhookReconciler {
        &self.reconciler
    }

    pub fn requests(&self) -> &TicketRequestHandler {
        &self.requests
    }

    pub fn sms(&self) -> Option<&dyn SmsSender> {
        self.sms.as_deref()
    }
}
