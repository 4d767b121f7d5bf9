use std::sync::Arc;
use crate::auth::TokenStore;
use crate::dispatcher::NotificationDispatcher;
use crate::rate_limit::RateLimiters;
// app's shared state

pub struct AppState {
    pub tokens: TokenStore,                   // read-only after startup
    pub limiters: Arc<RateLimiters>,          // shared with the sweeper task
    pub dispatcher: NotificationDispatcher,
    pub trust_forwarded_for: bool,
    pub disclose_auth_reason: bool,
}
