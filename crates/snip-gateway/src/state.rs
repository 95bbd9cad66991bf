use snip_core::ExpirationPolicy;
use snip_service::LinkService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn LinkService>,
    base_url: String,
    default_days_valid: i64,
}

impl AppState {
    pub fn new(
        service: Arc<dyn LinkService>,
        public_base_url: impl Into<String>,
        default_days_valid: i64,
    ) -> Self {
        Self {
            service,
            base_url: public_base_url.into(),
            default_days_valid,
        }
    }

    pub fn service(&self) -> &dyn LinkService {
        self.service.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn expiration_for(&self, days_valid: Option<i64>) -> ExpirationPolicy {
        ExpirationPolicy::days(days_valid.unwrap_or(self.default_days_valid))
    }
}
