use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::availability::{AvailabilityProvider, RandomAvailability};
use crate::booking::BookingState;
use crate::config::{SmtpConfig, StripeConfig};
use crate::wizard::Sequencer;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<HashMap<String, Session>>>,
    pub smtp: SmtpConfig,
    pub stripe: StripeConfig,
    pub availability: Arc<dyn AvailabilityProvider>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(smtp: SmtpConfig, stripe: StripeConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            smtp,
            stripe,
            availability: Arc::new(RandomAvailability::default()),
            http: reqwest::Client::new(),
        }
    }

    pub fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tri-state submission flag: a booking is sent at most once, and a send in
/// flight blocks further attempts until it settles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Submitted,
}

/// Everything one visitor's booking session owns. No cross-session sharing.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub booking: BookingState,
    pub wizard: Option<Sequencer>,
    pub submission: SubmissionState,
    pub submit_error: Option<String>,
}

impl Session {
    /// Claims the right to submit. Returns false (and changes nothing) when a
    /// send is already in flight or has already succeeded.
    pub fn begin_submission(&mut self) -> bool {
        if self.submission != SubmissionState::Idle {
            return false;
        }
        self.submission = SubmissionState::InFlight;
        true
    }

    pub fn finish_submission(&mut self, success: bool) {
        self.submission = if success {
            SubmissionState::Submitted
        } else {
            SubmissionState::Idle
        };
    }
}
