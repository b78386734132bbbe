use marquee_auth::IdentityService;
use marquee_core::{DispatchConfig, Dispatcher};

/// What the dispatch layer needs per request. Cheap to clone.
#[derive(Clone, Debug)]
pub struct DispatchState {
    pub dispatcher: Dispatcher,
    pub identity: IdentityService,
    pub debug_headers: bool,
}

impl DispatchState {
    pub fn new(dispatcher: Dispatcher, identity: IdentityService) -> Self {
        Self {
            dispatcher,
            identity,
            debug_headers: false,
        }
    }

    pub fn from_config(config: &DispatchConfig, identity: IdentityService) -> Self {
        Self {
            dispatcher: Dispatcher::from_config(config),
            identity,
            debug_headers: config.debug_headers,
        }
    }

    pub fn with_debug_headers(mut self, on: bool) -> Self {
        self.debug_headers = on;
        self
    }
}
