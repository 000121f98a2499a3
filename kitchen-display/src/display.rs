//! KitchenDisplay - 显示屏运行循环
//!
//! ```text
//! run(shutdown)
//!   ├─ WS 推送   → Ready ⇒ Snapshot, Event ⇒ Event
//!   ├─ 轮询      → ListOrders ⇒ Snapshot (无论推送是否正常)
//!   ├─ 渲染 tick → 重新计算倒计时，发布到 watch channel
//!   └─ 断线      → 继续轮询，指数退避重连 (1s … 30s)
//! ```
//!
//! Operator actions apply an optimistic update, call the server, and merge
//! the answer. A rejected command triggers an immediate re-fetch so the
//! prediction is reverted to the server's state.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared::kitchen::{DisplayCommand, DisplayMessage, KitchenEvent, KitchenOrder, KitchenOrderStatus};
use shared::util::now_millis;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::alarm::{AlarmSignal, AlarmSink};
use crate::config::DisplayConfig;
use crate::error::DisplayResult;
use crate::http::{KitchenBackend, KitchenHttpClient};
use crate::reconcile::{OrderView, ReconcileOutcome, Reconciler, Update};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One kitchen display: local table, alarm, and server link
pub struct KitchenDisplay<S, B = KitchenHttpClient> {
    config: DisplayConfig,
    backend: B,
    reconciler: Mutex<Reconciler>,
    alarm: Mutex<AlarmSignal<S>>,
    view_tx: watch::Sender<Vec<OrderView>>,
}

impl<S: AlarmSink> KitchenDisplay<S, KitchenHttpClient> {
    /// Display talking to the server at `config.base_url`
    pub fn connect(config: DisplayConfig, sink: S) -> DisplayResult<Self> {
        let backend = KitchenHttpClient::new(&config)?;
        Ok(Self::new(config, backend, sink))
    }
}

impl<S: AlarmSink, B: KitchenBackend> KitchenDisplay<S, B> {
    pub fn new(config: DisplayConfig, backend: B, sink: S) -> Self {
        let grace_ms = config.completed_grace.as_millis() as i64;
        let (view_tx, _) = watch::channel(Vec::new());
        Self {
            config,
            backend,
            reconciler: Mutex::new(Reconciler::new(grace_ms)),
            alarm: Mutex::new(AlarmSignal::new(sink)),
            view_tx,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// UI feed, updated after every merge and render tick
    pub fn subscribe(&self) -> watch::Receiver<Vec<OrderView>> {
        self.view_tx.subscribe()
    }

    pub fn views(&self) -> Vec<OrderView> {
        self.reconciler.lock().view(now_millis())
    }

    pub fn order(&self, order_id: i64) -> Option<KitchenOrder> {
        self.reconciler.lock().get(order_id).cloned()
    }

    pub fn is_alarm_playing(&self) -> bool {
        self.alarm.lock().is_playing()
    }

    // ========== Reconciliation ==========

    /// Merge an update, drive the alarm, publish the view, purge stale orders
    pub async fn merge(&self, update: Update) -> ReconcileOutcome {
        let outcome = self.merge_local(update);
        self.purge_stale(&outcome.stale_completed).await;
        outcome
    }

    /// Full `ListOrders` re-fetch
    pub async fn refresh(&self) -> DisplayResult<()> {
        let orders = self.backend.list_orders(self.config.kitchen_id).await?;
        self.merge(Update::Snapshot(orders)).await;
        Ok(())
    }

    fn merge_local(&self, update: Update) -> ReconcileOutcome {
        let now = now_millis();
        let (outcome, view) = {
            let mut reconciler = self.reconciler.lock();
            let outcome = reconciler.merge(update, now);
            (outcome, reconciler.view(now))
        };
        self.finish(&outcome, view);
        outcome
    }

    fn finish(&self, outcome: &ReconcileOutcome, view: Vec<OrderView>) {
        for order_id in &outcome.newly_expired {
            tracing::info!(kitchen_id = self.config.kitchen_id, order_id, "Order timer expired");
        }
        self.alarm.lock().apply(outcome.alarm);
        self.view_tx.send_replace(view);
    }

    fn publish_view(&self) {
        let view = self.reconciler.lock().view(now_millis());
        self.view_tx.send_replace(view);
    }

    /// Delete completed orders left behind past the grace period
    async fn purge_stale(&self, order_ids: &[i64]) {
        for &order_id in order_ids {
            match self.backend.delete(order_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(order_id, error = %e, "Could not purge completed order");
                    continue;
                }
            }
            tracing::debug!(order_id, "Purged stale completed order");
            self.merge_local(Update::Event(KitchenEvent::OrderDeleted { order_id }));
        }
    }

    // ========== Operator actions ==========

    pub async fn start_timer(&self, order_id: i64, cooking_time_minutes: u32) -> DisplayResult<KitchenOrder> {
        self.command(
            order_id,
            Some(KitchenOrderStatus::Cooking),
            self.backend.start_timer(order_id, cooking_time_minutes),
        )
        .await
    }

    pub async fn add_time(&self, order_id: i64, extra_seconds: Option<u32>) -> DisplayResult<KitchenOrder> {
        self.command(
            order_id,
            Some(KitchenOrderStatus::Cooking),
            self.backend.add_time(order_id, extra_seconds),
        )
        .await
    }

    pub async fn mark_ready(&self, order_id: i64) -> DisplayResult<KitchenOrder> {
        self.command(
            order_id,
            Some(KitchenOrderStatus::Ready),
            self.backend.mark_ready(order_id),
        )
        .await
    }

    /// Complete and remove in one server call
    pub async fn complete(&self, order_id: i64) -> DisplayResult<KitchenOrder> {
        let order = self
            .command(order_id, None, self.backend.complete_and_remove(order_id))
            .await?;
        self.merge_local(Update::Event(KitchenEvent::OrderDeleted { order_id }));
        Ok(order)
    }

    /// Delete; an order already gone counts as success
    pub async fn delete(&self, order_id: i64) -> DisplayResult<()> {
        self.predict(order_id, None);
        match self.backend.delete(order_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                self.revert(order_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Optimistic prediction; `None` removes the order from the table
    fn predict(&self, order_id: i64, status: Option<KitchenOrderStatus>) {
        let now = now_millis();
        let (outcome, view) = {
            let mut reconciler = self.reconciler.lock();
            let outcome = match status {
                Some(status) => reconciler.apply_optimistic(order_id, status, now),
                None => reconciler.remove_optimistic(order_id, now),
            };
            (outcome, reconciler.view(now))
        };
        self.finish(&outcome, view);
    }

    async fn command<F>(&self, order_id: i64, predicted: Option<KitchenOrderStatus>, call: F) -> DisplayResult<KitchenOrder>
    where
        F: Future<Output = DisplayResult<KitchenOrder>>,
    {
        self.predict(order_id, predicted);
        match call.await {
            Ok(order) => {
                self.merge(Update::Event(KitchenEvent::OrderUpdated { order: order.clone() }))
                    .await;
                Ok(order)
            }
            Err(e) => {
                self.revert(order_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Put the server's state back after a rejected prediction
    async fn revert(&self, order_id: i64, reason: &str) {
        tracing::info!(order_id, reason, "Command rejected, re-fetching kitchen orders");
        self.reconciler.lock().invalidate();
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Re-fetch after rejected command failed");
        }
    }

    // ========== Run loop ==========

    /// Keep the local table in sync until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) {
        let kitchen_id = self.config.kitchen_id;
        tracing::info!(kitchen_id, url = %self.config.ws_url(), "Kitchen display started");

        if let Err(e) = self.refresh().await {
            tracing::warn!(kitchen_id, error = %e, "Initial order fetch failed");
        }

        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        poll.tick().await; // skip immediate

        let mut render = tokio::time::interval(self.config.tick_interval);
        render.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut socket: Option<WsStream> = None;
        let mut backoff = INITIAL_BACKOFF;
        let mut next_connect = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                _ = poll.tick() => {
                    if let Err(e) = self.refresh().await {
                        tracing::debug!(kitchen_id, error = %e, "Order poll failed");
                    }
                }

                _ = render.tick() => {
                    let stale = self.reconciler.lock().needs_refresh();
                    if stale
                        && let Some(ws) = socket.as_mut()
                        && send_command(ws, &DisplayCommand::Resync).await.is_err()
                    {
                        socket = None;
                        next_connect = Instant::now() + backoff;
                    }
                    self.publish_view();
                }

                _ = tokio::time::sleep_until(next_connect), if socket.is_none() => {
                    match tokio_tungstenite::connect_async(self.config.ws_url()).await {
                        Ok((ws, _)) => {
                            tracing::info!(kitchen_id, "Kitchen push channel connected");
                            socket = Some(ws);
                            backoff = INITIAL_BACKOFF;
                        }
                        Err(e) => {
                            tracing::debug!(kitchen_id, error = %e, retry_in = ?backoff, "Push channel connect failed");
                            next_connect = Instant::now() + backoff;
                            backoff = (backoff * 2).min(MAX_BACKOFF);
                        }
                    }
                }

                frame = next_frame(&mut socket), if socket.is_some() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => match serde_json::from_str::<DisplayMessage>(&text) {
                            Ok(DisplayMessage::Ready { orders }) => {
                                self.merge(Update::Snapshot(orders)).await;
                            }
                            Ok(DisplayMessage::Event { event }) => {
                                self.merge(Update::Event(event)).await;
                            }
                            Err(e) => {
                                tracing::debug!(kitchen_id, error = %e, "Ignoring unknown push frame");
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(kitchen_id, "Kitchen push channel closed, polling until reconnect");
                            socket = None;
                            next_connect = Instant::now() + backoff;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(kitchen_id, error = %e, "Kitchen push channel failed, polling until reconnect");
                            socket = None;
                            next_connect = Instant::now() + backoff;
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }
        }

        if let Some(mut ws) = socket {
            let _ = ws.close(None).await;
        }
        self.alarm.lock().stop();
        tracing::info!(kitchen_id, "Kitchen display stopped");
    }
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

async fn send_command(ws: &mut WsStream, cmd: &DisplayCommand) -> DisplayResult<()> {
    let json = serde_json::to_string(cmd)?;
    ws.send(Message::Text(json.into())).await?;
    Ok(())
}
