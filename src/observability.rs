use biometrics::{Collector, Counter, Moments};

pub(crate) static BACKEND_REQUESTS: Counter = Counter::new("rolechat.backend.requests");
pub(crate) static BACKEND_REQUEST_ERRORS: Counter =
    Counter::new("rolechat.backend.request_errors");
pub(crate) static BACKEND_REQUEST_DURATION: Moments =
    Moments::new("rolechat.backend.request_duration_seconds");

pub(crate) static SESSIONS_STARTED: Counter = Counter::new("rolechat.session.started");
pub(crate) static SESSIONS_ENDED: Counter = Counter::new("rolechat.session.ended");
pub(crate) static MESSAGES_SENT: Counter = Counter::new("rolechat.session.messages_sent");
pub(crate) static MESSAGES_REJECTED: Counter = Counter::new("rolechat.session.messages_rejected");
pub(crate) static REQUESTS_ABORTED: Counter = Counter::new("rolechat.session.requests_aborted");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&BACKEND_REQUESTS);
    collector.register_counter(&BACKEND_REQUEST_ERRORS);
    collector.register_moments(&BACKEND_REQUEST_DURATION);

    collector.register_counter(&SESSIONS_STARTED);
    collector.register_counter(&SESSIONS_ENDED);
    collector.register_counter(&MESSAGES_SENT);
    collector.register_counter(&MESSAGES_REJECTED);
    collector.register_counter(&REQUESTS_ABORTED);
}
