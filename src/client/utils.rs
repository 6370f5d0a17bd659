use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use crate::client::config::Config;
use crate::client::consts::{AUTHORIZATION_HEADER, VERSION_HEADER};

pub fn build_request(
    config: &Config,
    agent_id: &str,
) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request =
        format!("{}/agents/stream/{}", config.base_url(), agent_id).into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION_HEADER,
        format!("Bearer {}", config.api_key().expose_secret())
            .as_str()
            .parse()?,
    );
    request
        .headers_mut()
        .insert(VERSION_HEADER, config.version().parse()?);
    Ok(request)
}
