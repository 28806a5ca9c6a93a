use preread::components::{CredentialStore, TokenManager};
use preread::config::Config;
use preread::error::{oauth_error, other_error};
use std::sync::Arc;
use url::Url;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Load configuration
    let config = Config::load()?;
    let redirect_uri = Url::parse(&config.redirect_uri)
        .map_err(|e| other_error(&format!("Invalid redirect URI: {}", e)))?;
    let token_path = config.token_path.clone();
    let config = config.shared();

    let store = Arc::new(CredentialStore::new(token_path.clone()));
    let token_manager = TokenManager::new(config, store);

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();
    let auth_url = token_manager.authorization_url(&state).await?;

    // Listen where Google will redirect to
    let host = redirect_uri.host_str().unwrap_or("localhost");
    let port = redirect_uri.port_or_known_default().unwrap_or(80);
    let server = tiny_http::Server::http(format!("{}:{}", host, port))
        .map_err(|e| other_error(&format!("Failed to listen on {}:{}: {}", host, port, e)))?;

    // Open browser for authorization
    println!("Opening browser for Google authorization...");
    if webbrowser::open(auth_url.as_str()).is_err() {
        println!("Open this URL to continue:\n{}", auth_url);
    }
    println!("Waiting for authorization callback on {}...", redirect_uri);

    // Ignore stray requests (favicon and the like) until the redirect arrives
    let (request, callback) = loop {
        let request = server
            .recv()
            .map_err(|e| other_error(&format!("Failed to receive callback: {}", e)))?;
        let callback = redirect_uri
            .join(request.url())
            .map_err(|e| other_error(&format!("Malformed callback URL: {}", e)))?;
        if callback.path() == redirect_uri.path() {
            break (request, callback);
        }
        let _ = request.respond(tiny_http::Response::empty(tiny_http::StatusCode(404)));
    };

    let param = |name: &str| {
        callback
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let result = match (param("error"), param("state"), param("code")) {
        (Some(error), _, _) => Err(oauth_error(&format!("Consent was not granted: {}", error))),
        (None, Some(received), Some(code)) if received == state => {
            token_manager.exchange_code(&code).await.map(|_| ())
        }
        (None, Some(_), Some(_)) => Err(oauth_error("State mismatch in callback")),
        _ => Err(oauth_error("No authorization code found in callback")),
    };

    // Send response to browser
    let message = match &result {
        Ok(()) => "Authorization successful! You can close this window.".to_string(),
        Err(e) => format!("Authorization failed: {}", e),
    };
    let _ = request.respond(tiny_http::Response::from_string(message));

    result?;
    println!("Token successfully saved to {}", token_path.display());

    Ok(())
}
