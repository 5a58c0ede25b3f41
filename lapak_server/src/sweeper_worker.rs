use std::time::Duration;

use borongan_engine::{db_types::GroupBuy, GroupBuyFlowApi, PaymentGateway, SqliteDatabase};
use chrono::Utc;
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the deadline sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_sweeper_worker<G>(api: GroupBuyFlowApi<SqliteDatabase, G>, interval: Duration) -> JoinHandle<()>
where G: PaymentGateway + Send + Sync + 'static {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Deadline sweeper started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running deadline sweep");
            match api.expire_group_buys(Utc::now()).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No overdue group buys"),
                Ok(expired) => {
                    info!("🕰️ {} group buys expired", expired.len());
                    debug!("🕰️ Expired group buys: {}", group_buy_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running the deadline sweep: {e}");
                },
            }
        }
    })
}

fn group_buy_list(group_buys: &[GroupBuy]) -> String {
    group_buys
        .iter()
        .map(|g| format!("[{}] '{}' {}/{}", g.id, g.title, g.current_quantity, g.target_quantity))
        .collect::<Vec<String>>()
        .join(", ")
}
