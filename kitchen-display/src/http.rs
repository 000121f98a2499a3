//! HTTP 客户端 - 厨房订单命令与查询

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::kitchen::{KitchenOrder, NewKitchenOrder};

use crate::config::DisplayConfig;
use crate::error::{DisplayError, DisplayResult};

/// Command and query surface the display needs from the server
///
/// Implemented over HTTP by [`KitchenHttpClient`]; tests substitute an
/// in-memory backend.
#[async_trait]
pub trait KitchenBackend: Send + Sync {
    async fn list_orders(&self, kitchen_id: i64) -> DisplayResult<Vec<KitchenOrder>>;
    async fn create_order(&self, kitchen_id: i64, input: &NewKitchenOrder) -> DisplayResult<KitchenOrder>;
    async fn start_timer(&self, order_id: i64, cooking_time_minutes: u32) -> DisplayResult<KitchenOrder>;
    async fn add_time(&self, order_id: i64, extra_seconds: Option<u32>) -> DisplayResult<KitchenOrder>;
    async fn mark_ready(&self, order_id: i64) -> DisplayResult<KitchenOrder>;
    async fn complete(&self, order_id: i64) -> DisplayResult<KitchenOrder>;
    /// Complete and purge in one server-side transaction
    async fn complete_and_remove(&self, order_id: i64) -> DisplayResult<KitchenOrder>;
    async fn delete(&self, order_id: i64) -> DisplayResult<()>;
    /// Returns the number of orders removed
    async fn delete_all(&self, kitchen_id: i64) -> DisplayResult<usize>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartTimerBody {
    cooking_time_minutes: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddTimeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_seconds: Option<u32>,
}

#[derive(Deserialize)]
struct DeleteAllBody {
    removed: usize,
}

/// 网络 HTTP 客户端
#[derive(Debug, Clone)]
pub struct KitchenHttpClient {
    client: Client,
    base_url: String,
}

impl KitchenHttpClient {
    pub fn new(config: &DisplayConfig) -> DisplayResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> DisplayResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(DisplayError::from_body(status.as_u16(), text));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> DisplayResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(&self, path: &str, body: &B) -> DisplayResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> DisplayResult<T> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    async fn delete_path<T: DeserializeOwned>(&self, path: &str) -> DisplayResult<T> {
        let response = self.client.delete(self.url(path)).send().await?;
        Self::handle_response(response).await
    }
}

#[async_trait]
impl KitchenBackend for KitchenHttpClient {
    async fn list_orders(&self, kitchen_id: i64) -> DisplayResult<Vec<KitchenOrder>> {
        self.get(&format!("api/kitchens/{kitchen_id}/orders")).await
    }

    async fn create_order(&self, kitchen_id: i64, input: &NewKitchenOrder) -> DisplayResult<KitchenOrder> {
        self.post(&format!("api/kitchens/{kitchen_id}/orders"), input).await
    }

    async fn start_timer(&self, order_id: i64, cooking_time_minutes: u32) -> DisplayResult<KitchenOrder> {
        self.post(
            &format!("api/kitchen-orders/{order_id}/start-timer"),
            &StartTimerBody {
                cooking_time_minutes,
            },
        )
        .await
    }

    async fn add_time(&self, order_id: i64, extra_seconds: Option<u32>) -> DisplayResult<KitchenOrder> {
        self.post(
            &format!("api/kitchen-orders/{order_id}/add-time"),
            &AddTimeBody { extra_seconds },
        )
        .await
    }

    async fn mark_ready(&self, order_id: i64) -> DisplayResult<KitchenOrder> {
        self.post_empty(&format!("api/kitchen-orders/{order_id}/ready")).await
    }

    async fn complete(&self, order_id: i64) -> DisplayResult<KitchenOrder> {
        self.post_empty(&format!("api/kitchen-orders/{order_id}/complete")).await
    }

    async fn complete_and_remove(&self, order_id: i64) -> DisplayResult<KitchenOrder> {
        self.post_empty(&format!("api/kitchen-orders/{order_id}/complete?remove=true"))
            .await
    }

    async fn delete(&self, order_id: i64) -> DisplayResult<()> {
        let _: bool = self.delete_path(&format!("api/kitchen-orders/{order_id}")).await?;
        Ok(())
    }

    async fn delete_all(&self, kitchen_id: i64) -> DisplayResult<usize> {
        let body: DeleteAllBody = self.delete_path(&format!("api/kitchens/{kitchen_id}/orders")).await?;
        Ok(body.removed)
    }
}
