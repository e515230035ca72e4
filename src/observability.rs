use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static SESSION_EXPIRIES: Counter = Counter::new("palaver.session.expiries");
pub(crate) static PRESENCE_ERRORS: Counter = Counter::new("palaver.presence.errors");

pub(crate) static LIVE_CONNECTS: Counter = Counter::new("palaver.live.connects");
pub(crate) static LIVE_CONNECT_ERRORS: Counter = Counter::new("palaver.live.connect_errors");
pub(crate) static LIVE_MESSAGES: Counter = Counter::new("palaver.live.messages");
pub(crate) static LIVE_PARSE_ERRORS: Counter = Counter::new("palaver.live.parse_errors");
pub(crate) static LIVE_STREAM_ERRORS: Counter = Counter::new("palaver.live.stream_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&SESSION_EXPIRIES);
    collector.register_counter(&PRESENCE_ERRORS);

    collector.register_counter(&LIVE_CONNECTS);
    collector.register_counter(&LIVE_CONNECT_ERRORS);
    collector.register_counter(&LIVE_MESSAGES);
    collector.register_counter(&LIVE_PARSE_ERRORS);
    collector.register_counter(&LIVE_STREAM_ERRORS);
}
