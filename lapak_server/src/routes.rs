//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module or the engine. Keep this module neat and
//! tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and gateway call below is async for this reason.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use borongan_engine::{
    db_types::{GroupBuyId, NewGroupBuy, ParticipantId},
    GroupBuyFlowApi,
    LedgerStore,
    PaymentFlowApi,
    PaymentGateway,
};
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use lapak_common::Secret;
use log::*;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{DeadlineCheckResult, JoinParams, JsonResponse, PaymentMethods, StatusQuery},
    errors::{AuthError, ServerError},
};

pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Callback-Signature";
pub const CALLBACK_EVENT_HEADER: &str = "X-Callback-Event";
pub const INTERNAL_KEY_HEADER: &str = "X-Internal-Key";

/// The shared key that guards the `/internal` scope. `None` leaves the scope open.
#[derive(Clone, Debug, Default)]
pub struct InternalApiKey(pub Option<Secret<String>>);

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn parse_id<T: FromStr>(value: &str) -> Result<T, ServerError>
where T::Err: std::fmt::Display {
    T::from_str(value).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Group buys  ----------------------------------------------------
route!(create_group_buy => Post "/borongan" impl LedgerStore, PaymentGateway);
pub async fn create_group_buy<B: LedgerStore, G: PaymentGateway>(
    user: AuthenticatedUser,
    body: web::Json<NewGroupBuy>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST create group buy for {}", user.user_id);
    let group_buy = api.create_group_buy(&user.user_id(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(group_buy))
}

route!(group_buy_detail => Get "/borongan/{id}" impl LedgerStore, PaymentGateway);
pub async fn group_buy_detail<B: LedgerStore, G: PaymentGateway>(
    path: web::Path<String>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_id::<GroupBuyId>(&path.into_inner())?;
    trace!("💻️ GET group buy {id}");
    let detail = api.group_buy_detail(&id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(join_group_buy => Post "/borongan/{id}/join" impl LedgerStore, PaymentGateway);
pub async fn join_group_buy<B: LedgerStore, G: PaymentGateway>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<JoinParams>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_id::<GroupBuyId>(&path.into_inner())?;
    debug!("💻️ POST join {id} for {} ({} units)", user.user_id, body.quantity_ordered);
    let confirmation = api.join(&id, &user.payer(), body.quantity_ordered).await?;
    Ok(HttpResponse::Ok().json(confirmation))
}

route!(complete_group_buy => Post "/borongan/{id}/complete" impl LedgerStore, PaymentGateway);
pub async fn complete_group_buy<B: LedgerStore, G: PaymentGateway>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_id::<GroupBuyId>(&path.into_inner())?;
    debug!("💻️ POST complete {id} by {}", user.user_id);
    let group_buy = api.complete_group_buy(&id, &user.user_id()).await?;
    Ok(HttpResponse::Ok().json(group_buy))
}

route!(mark_collected => Post "/participants/{id}/collected" impl LedgerStore, PaymentGateway);
pub async fn mark_collected<B: LedgerStore, G: PaymentGateway>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_id::<ParticipantId>(&path.into_inner())?;
    debug!("💻️ POST collected {id} by {}", user.user_id);
    let participant = api.mark_collected(&id, &user.user_id()).await?;
    Ok(HttpResponse::Ok().json(participant))
}

//----------------------------------------------    Payments   ----------------------------------------------------
route!(payment_webhook => Post "/payments/tripay/webhook" impl LedgerStore, PaymentGateway);
/// Receives payment callbacks. The body is taken as raw bytes so that the signature is checked over exactly what the
/// gateway sent.
pub async fn payment_webhook<B: LedgerStore, G: PaymentGateway>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment callback ({} bytes)", body.len());
    let signature = header_value(&req, CALLBACK_SIGNATURE_HEADER);
    let event = header_value(&req, CALLBACK_EVENT_HEADER);
    let ack = api.handle_notification(&body, signature, event).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(ack.message)))
}

route!(payment_status => Get "/payments/status/{participant_id}" impl LedgerStore, PaymentGateway);
pub async fn payment_status<B: LedgerStore, G: PaymentGateway>(
    path: web::Path<String>,
    query: web::Query<StatusQuery>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_id::<ParticipantId>(&path.into_inner())?;
    trace!("💻️ GET payment status for {id}");
    let report = api.payment_status(&id, query.refresh()).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(payment_methods => Get "/payments/methods" impl LedgerStore, PaymentGateway);
pub async fn payment_methods<B: LedgerStore, G: PaymentGateway>(
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let channels = api.payment_channels().await?;
    Ok(HttpResponse::Ok().json(PaymentMethods::new(channels)))
}

//----------------------------------------------    Internal   ----------------------------------------------------
route!(trigger_deadline_check => Post "/trigger-deadline-check" impl LedgerStore, PaymentGateway);
/// Runs one deadline sweep on demand, for an external scheduler.
pub async fn trigger_deadline_check<B: LedgerStore, G: PaymentGateway>(
    req: HttpRequest,
    key: web::Data<InternalApiKey>,
    api: web::Data<GroupBuyFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    if let Some(expected) = &key.0 {
        let provided = header_value(&req, INTERNAL_KEY_HEADER).unwrap_or_default();
        if !constant_time_eq(provided.as_bytes(), expected.reveal().as_bytes()) {
            warn!("💻️ Rejected a deadline check with a bad internal key");
            return Err(AuthError::InvalidInternalKey.into());
        }
    }
    let now = Utc::now();
    info!("💻️ Deadline check triggered");
    let expired = api.expire_group_buys(now).await?;
    Ok(HttpResponse::Ok().json(DeadlineCheckResult::new(expired.len(), now)))
}
