use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::types::{
    ActionResult, ApiKey, ApiKeyInput, CacheClearScope, ServiceTestKind, SystemHealth, UsageLogPage,
    UsageLogQuery, MAX_PAGE_SIZE,
};
use super::{check_success_flag, segment, with_query};
use crate::api::{ApiClient, ApiError, ApiRequest, HttpClient};

const ROOT: &str = "/management";

// Service management endpoints
impl<H: HttpClient> ApiClient<H> {
    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>, ApiError> {
        check_success_flag(self.get(&format!("{ROOT}/api-keys")).await).decode_field("api_keys")
    }

    /// Adds a key, or replaces the key of an existing service
    pub async fn add_api_key(&self, input: &ApiKeyInput) -> Result<ActionResult, ApiError> {
        if input.service_name.as_deref().is_none_or(str::is_empty)
            || input.api_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(ApiError::InvalidRequest(
                "service_name and api_key are required".to_string(),
            ));
        }

        let request = ApiRequest::new(Method::POST, format!("{ROOT}/api-keys")).with_json(input)?;
        let result = self.action(request).await?;
        info!(service = ?input.service_name, "API key saved");
        Ok(result)
    }

    pub async fn update_api_key(&self, service: &str, input: &ApiKeyInput) -> Result<ActionResult, ApiError> {
        let request =
            ApiRequest::new(Method::PUT, format!("{ROOT}/api-keys/{}", segment(service))).with_json(input)?;
        self.action(request).await
    }

    pub async fn delete_api_key(&self, service: &str) -> Result<ActionResult, ApiError> {
        let result = self
            .action(ApiRequest::delete(format!("{ROOT}/api-keys/{}", segment(service))))
            .await?;
        info!(service = %service, "API key deleted");
        Ok(result)
    }

    /// Enables or disables the key of `service`
    pub async fn toggle_api_key(&self, service: &str, active: bool) -> Result<ActionResult, ApiError> {
        let request = ApiRequest::post(
            format!("{ROOT}/api-keys/{}/toggle", segment(service)),
            json!({ "is_active": active }),
        );
        self.action(request).await
    }

    /// Runs a small generation against `service` to check its key works
    ///
    /// Returns the service's test result payload.
    pub async fn test_service(&self, service: &str, kind: ServiceTestKind) -> Result<Value, ApiError> {
        if service.is_empty() {
            return Err(ApiError::InvalidRequest("Service name required".to_string()));
        }
        let request = ApiRequest::post(
            format!("{ROOT}/test-api/{}", segment(service)),
            json!({ "type": kind }),
        );
        let result = check_success_flag(self.request(request).await).decode_field("test_result")?;
        info!(service = %service, kind = ?kind, "Service test passed");
        Ok(result)
    }

    /// Exports usage logs for the last `days` days as CSV
    pub async fn export_logs(&self, service: Option<&str>, days: u32) -> Result<String, ApiError> {
        let path = with_query(
            &format!("{ROOT}/export-logs"),
            &[
                ("service_name", service.map(str::to_string)),
                ("days", Some(days.max(1).to_string())),
            ],
        );
        check_success_flag(self.get(&path).await).into_text()
    }

    /// Usage statistics for the last `days` days, for one service or all
    pub async fn usage_stats(&self, service: Option<&str>, days: u32) -> Result<Value, ApiError> {
        let path = with_query(
            &format!("{ROOT}/usage-stats"),
            &[
                ("service_name", service.map(str::to_string)),
                ("days", Some(days.max(1).to_string())),
            ],
        );
        check_success_flag(self.get(&path).await).into_result()
    }

    /// One page of usage logs, newest first
    ///
    /// The page size is capped at [`MAX_PAGE_SIZE`].
    pub async fn usage_logs(&self, query: &UsageLogQuery) -> Result<UsageLogPage, ApiError> {
        let per_page = query.per_page.clamp(1, MAX_PAGE_SIZE);
        let path = with_query(
            &format!("{ROOT}/usage-logs"),
            &[
                ("page", Some(query.page.max(1).to_string())),
                ("per_page", Some(per_page.to_string())),
                ("service_name", query.service_name.clone()),
                ("user_id", query.user_id.clone()),
                ("status", query.status.clone()),
            ],
        );
        debug!(path = %path, "Fetching usage logs");
        check_success_flag(self.get(&path).await).decode()
    }

    pub async fn service_status(&self) -> Result<Value, ApiError> {
        check_success_flag(self.get(&format!("{ROOT}/service-status")).await).decode_field("services")
    }

    pub async fn cache_stats(&self) -> Result<Value, ApiError> {
        check_success_flag(self.get(&format!("{ROOT}/cache-stats")).await).decode_field("cache_stats")
    }

    pub async fn clear_cache(&self, scope: CacheClearScope) -> Result<ActionResult, ApiError> {
        let request = ApiRequest::post(format!("{ROOT}/cache/clear"), json!({ "type": scope }));
        let result = self.action(request).await?;
        info!(scope = ?scope, "Cache cleared");
        Ok(result)
    }

    pub async fn queue_stats(&self) -> Result<Value, ApiError> {
        check_success_flag(self.get(&format!("{ROOT}/queue-stats")).await).decode_field("queue_stats")
    }

    pub async fn rate_limits(&self, user_id: Option<&str>) -> Result<Value, ApiError> {
        let path = with_query(
            &format!("{ROOT}/rate-limits"),
            &[("user_id", user_id.map(str::to_string))],
        );
        check_success_flag(self.get(&path).await).decode_field("rate_limits")
    }

    pub async fn reset_rate_limits(&self, user_id: &str) -> Result<ActionResult, ApiError> {
        if user_id.is_empty() {
            return Err(ApiError::InvalidRequest("User ID required".to_string()));
        }
        let request = ApiRequest::post(format!("{ROOT}/rate-limits/reset"), json!({ "user_id": user_id }));
        self.action(request).await
    }

    pub async fn system_health(&self) -> Result<SystemHealth, ApiError> {
        check_success_flag(self.get(&format!("{ROOT}/system-health")).await).decode_field("health")
    }

    async fn action(&self, request: ApiRequest) -> Result<ActionResult, ApiError> {
        check_success_flag(self.request(request).await).decode()
    }
}
