use std::sync::Arc;

use crate::auth::{AuthSessionManager, PhoneAuthProvider};
use crate::booking::session_storage::SessionStorage;
use crate::fare::FareService;
use crate::geo::Geocoder;
use crate::observability::metrics::Metrics;
use crate::persistence::HostedStore;

/// External collaborators the service talks to.
pub struct Services {
    pub store: Arc<dyn HostedStore>,
    pub fare: Arc<dyn FareService>,
    pub geocoder: Arc<dyn Geocoder>,
    pub phone_auth: Arc<dyn PhoneAuthProvider>,
}

pub struct AppState {
    pub store: Arc<dyn HostedStore>,
    pub fare: Arc<dyn FareService>,
    pub geocoder: Arc<dyn Geocoder>,
    pub auth: AuthSessionManager,
    pub sessions: SessionStorage,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(services: Services, default_country_code: &str, event_buffer_size: usize) -> Self {
        let metrics = Metrics::new();
        let auth = AuthSessionManager::new(
            services.phone_auth,
            services.store.clone(),
            default_country_code,
            event_buffer_size,
            metrics.clone(),
        );

        Self {
            store: services.store,
            fare: services.fare,
            geocoder: services.geocoder,
            auth,
            sessions: SessionStorage::new(),
            metrics,
        }
    }
}
