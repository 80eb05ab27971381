//! Slack adapters.
//!
//! - `SocketModeStream` - Per-workspace Socket Mode event stream
//! - `SlackWebApi` - `chat.postMessage` and `auth.test` with a bot token
//! - `SlackOAuthClient` - `oauth.v2.access` code exchange and token refresh
//! - `SlackTransportFactory` - Builds the first two from stored credentials

mod api;
mod factory;
mod oauth;
mod socket_mode;
mod web_api;

pub use factory::SlackTransportFactory;
pub use oauth::{authorize_url, SlackOAuthClient, SLACK_AUTHORIZE_URL};
pub use socket_mode::SocketModeStream;
pub use web_api::SlackWebApi;
