use std::sync::Arc;

use http_auth_interceptor::{
    bearer_updater, AuthEvent, AuthInterceptor, AuthService, EventBus, RequestBuffer,
    RequestDescriptor, ReqwestTransport,
};

/// Fetches `/me` from `AUTH_INTERCEPTOR_BASE_URL`. When the API answers 401,
/// a stand-in login flow picks up `AUTH_TOKEN` and confirms the login, which
/// replays the request with the new token.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let transport = ReqwestTransport::from_env().map_err(anyhow::Error::msg)?;
    let token = std::env::var("AUTH_TOKEN")?;

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let interceptor = Arc::new(AuthInterceptor::new(
        transport,
        Arc::new(RequestBuffer::new()),
        Arc::new(bus),
    ));
    let auth = AuthService::new(interceptor.clone());

    let login = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("{}", event.name());
            if let AuthEvent::LoginRequired(failure) = event {
                println!("login required for {} {}", failure.request.method, failure.request.url);
                match bearer_updater(&token) {
                    Ok(update) => auth.login_confirmed_with(None, update).await,
                    Err(err) => auth.login_cancelled(None, Some(err.to_string())),
                }
            }
        }
    });

    let response = interceptor.execute(RequestDescriptor::get("/me")).await?;
    println!("{} {}", response.status, response.body);

    login.abort();
    Ok(())
}
