/// OAuth 2.0 token requests.
pub mod credentials;
