use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use borongan_engine::{
    events::{EventHandlers, EventHooks, EventProducers, GroupBuyStatusChangedEvent, PaymentSettledEvent},
    GroupBuyFlowApi,
    LedgerStore,
    PaymentFlowApi,
    PaymentGateway,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::{Authenticator, JwtAuthenticator},
    config::ServerConfig,
    errors::ServerError,
    integrations::tripay::TripayGateway,
    routes::{
        health,
        CompleteGroupBuyRoute,
        CreateGroupBuyRoute,
        GroupBuyDetailRoute,
        InternalApiKey,
        JoinGroupBuyRoute,
        MarkCollectedRoute,
        PaymentMethodsRoute,
        PaymentStatusRoute,
        PaymentWebhookRoute,
        TriggerDeadlineCheckRoute,
    },
    sweeper_worker::start_sweeper_worker,
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = TripayGateway::new(config.tripay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    match config.sweep_interval {
        Some(interval) => {
            let api = GroupBuyFlowApi::new(db.clone(), gateway.clone(), producers.clone());
            let _ = start_sweeper_worker(api, interval);
        },
        None => info!("🚀️ The deadline sweeper is disabled. Use /internal/trigger-deadline-check instead."),
    }
    let authenticator = Arc::new(JwtAuthenticator::new(&config.auth)) as Arc<dyn Authenticator>;
    let srv = create_server_instance(config, db, gateway, producers, authenticator)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Hooks that write every engine event to the log. Refunds and notifications hang off these.
pub fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_status_changed(|ev: GroupBuyStatusChangedEvent| {
            Box::pin(async move {
                info!(
                    "📬️ Group buy {} moved from {} to {} at {}/{}",
                    ev.group_buy.id,
                    ev.old_status,
                    ev.group_buy.status,
                    ev.group_buy.current_quantity,
                    ev.group_buy.target_quantity
                );
            })
        })
        .on_payment_settled(|ev: PaymentSettledEvent| {
            Box::pin(async move {
                info!(
                    "📬️ Payment for participant {} moved from {} to {}",
                    ev.participant.id, ev.old_status, ev.participant.payment_status
                );
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: TripayGateway,
    producers: EventProducers,
    authenticator: Arc<dyn Authenticator>,
) -> Result<Server, ServerError> {
    let gateway_timeout = config.gateway_timeout;
    let internal_key = InternalApiKey(config.internal_api_key.clone());
    let srv = HttpServer::new(move || {
        let group_buy_api = GroupBuyFlowApi::new(db.clone(), gateway.clone(), producers.clone())
            .with_gateway_timeout(gateway_timeout);
        let payment_api =
            PaymentFlowApi::new(db.clone(), gateway.clone(), producers.clone()).with_gateway_timeout(gateway_timeout);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lapak::access_log"))
            .app_data(web::Data::new(group_buy_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(internal_key.clone()))
            .app_data(web::Data::from(authenticator.clone()))
            .configure(configure_routes::<SqliteDatabase, TripayGateway>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The engine APIs, the internal key and the authenticator must already be in the app data.
pub fn configure_routes<B, G>(cfg: &mut web::ServiceConfig)
where
    B: LedgerStore + 'static,
    G: PaymentGateway + 'static,
{
    let api_scope = web::scope("/api/v1")
        .service(CreateGroupBuyRoute::<B, G>::new())
        .service(GroupBuyDetailRoute::<B, G>::new())
        .service(JoinGroupBuyRoute::<B, G>::new())
        .service(CompleteGroupBuyRoute::<B, G>::new())
        .service(MarkCollectedRoute::<B, G>::new())
        .service(PaymentWebhookRoute::<B, G>::new())
        .service(PaymentStatusRoute::<B, G>::new())
        .service(PaymentMethodsRoute::<B, G>::new());
    let internal_scope = web::scope("/internal").service(TriggerDeadlineCheckRoute::<B, G>::new());
    cfg.service(health).service(api_scope).service(internal_scope);
}
