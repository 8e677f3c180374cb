pub mod alert_history;
pub mod alert_rule;
pub mod funnel_event;
pub mod funnel_session;
pub mod purchase;
