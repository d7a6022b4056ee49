use crate::config::AppConfig;
use crate::fetcher::GigFetcher;
use crate::refresh::CalendarSnapshot;
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use tokio::sync::{Mutex, MutexGuard};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub fetcher: GigFetcher,
    pub snapshot: Arc<Mutex<Option<Arc<CalendarSnapshot>>>>,
    pub progress: Arc<AtomicU8>,
    refresh_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let fetcher = GigFetcher::new(config.api_url.clone(), config.failure_policy);
        Self {
            config: Arc::new(config),
            fetcher,
            snapshot: Arc::new(Mutex::new(None)),
            progress: Arc::new(AtomicU8::new(0)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Single-flight guard; `None` while another refresh holds it.
    pub fn try_begin_refresh(&self) -> Option<MutexGuard<'_, ()>> {
        self.refresh_lock.try_lock().ok()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub async fn latest(&self) -> Option<Arc<CalendarSnapshot>> {
        self.snapshot.lock().await.clone()
    }
}
