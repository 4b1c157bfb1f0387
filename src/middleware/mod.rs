pub mod auth;
pub mod onboarding;
pub mod request_id;
