use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use africastalking_client::{AfricasTalkingClient, AfricasTalkingOptions};
use email_client::{EmailClient, EmailOptions};
use mamba_common::config::SmsProvider;
use mamba_common::Config;
use mamba_dispatch::{DispatchService, MemoryDirectory, MemoryIncidentStore};
use mamba_notify::adapters::{
    AfricasTalkingSmsAdapter, AfricasTalkingWhatsAppAdapter, EmailAdapter, TwilioSmsAdapter,
    TwilioWhatsAppAdapter,
};
use mamba_notify::{MemoryAuditLog, NotificationRouter};
use mamba_realtime::BroadcastHub;
use twilio::{TwilioClient, TwilioOptions};

mod routes;
mod ws;

pub struct AppState {
    pub dispatch: DispatchService,
    pub hub: Arc<BroadcastHub>,
    pub router: Arc<NotificationRouter>,
}

/// Wire channel adapters from configuration. A provider without complete
/// credentials is skipped; its channel then reports UnknownChannel at
/// dispatch time instead of failing startup.
fn build_router(config: &Config, audit: Arc<MemoryAuditLog>) -> NotificationRouter {
    let mut router = NotificationRouter::new(
        audit,
        Duration::from_secs(config.notify_timeout_secs),
    );

    match config.sms_provider {
        SmsProvider::Twilio => {
            if let (Some(account_sid), Some(auth_token), Some(phone_number)) = (
                config.twilio_account_sid.clone(),
                config.twilio_auth_token.clone(),
                config.twilio_phone_number.clone(),
            ) {
                let client = TwilioClient::new(TwilioOptions {
                    account_sid,
                    auth_token,
                    phone_number,
                });
                router = router
                    .with_adapter(Arc::new(TwilioSmsAdapter::new(client.clone())))
                    .with_adapter(Arc::new(TwilioWhatsAppAdapter::new(client)));
            } else {
                tracing::warn!("Twilio credentials incomplete; SMS channel disabled");
            }
        }
        SmsProvider::AfricasTalking => {
            if let (Some(username), Some(api_key)) = (
                config.africastalking_username.clone(),
                config.africastalking_api_key.clone(),
            ) {
                let client = AfricasTalkingClient::new(AfricasTalkingOptions { username, api_key });
                router = router
                    .with_adapter(Arc::new(AfricasTalkingSmsAdapter::new(client.clone())))
                    .with_adapter(Arc::new(AfricasTalkingWhatsAppAdapter::new(client)));
            } else {
                tracing::warn!("Africa's Talking credentials incomplete; SMS channel disabled");
            }
        }
    }

    if let (Some(service_id), Some(template_id), Some(user_id)) = (
        config.email_service_id.clone(),
        config.email_template_id.clone(),
        config.email_user_id.clone(),
    ) {
        let client = EmailClient::new(EmailOptions {
            api_url: config.email_api_url.clone(),
            service_id,
            template_id,
            user_id,
            from_name: "Mamba Emergency System".to_string(),
        });
        router = router.with_adapter(Arc::new(EmailAdapter::new(client)));
    } else {
        tracing::warn!("Email gateway credentials incomplete; email channel disabled");
    }

    router
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mamba=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let directory = match &config.hospital_seed_path {
        Some(path) => Arc::new(MemoryDirectory::from_seed_file(path)?),
        None => {
            tracing::warn!("No HOSPITAL_SEED_PATH set; directory starts empty");
            Arc::new(MemoryDirectory::new())
        }
    };

    let audit = Arc::new(MemoryAuditLog::new());
    let router = Arc::new(build_router(&config, audit));
    let hub = Arc::new(BroadcastHub::default());
    let store = Arc::new(MemoryIncidentStore::new());

    let dispatch = DispatchService::new(
        directory,
        store,
        router.clone(),
        hub.clone(),
        config.emergency_contacts.clone(),
    );

    let state = Arc::new(AppState {
        dispatch,
        hub,
        router,
    });

    let app = routes::build(state).layer(
        tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            },
        ),
    );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Mamba dispatch API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
