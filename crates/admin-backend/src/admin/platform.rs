use reqwest::Method;
use tracing::info;

use super::types::{ApiConfig, ApiConfigInput, TaskCreditCost, TaskCreditCostUpdate, UsageAnalytics};
use super::{segment, with_query};
use crate::api::{ApiClient, ApiError, ApiRequest, HttpClient};

// Service integrations, task pricing and analytics
impl<H: HttpClient> ApiClient<H> {
    pub async fn api_configs(&self) -> Result<Vec<ApiConfig>, ApiError> {
        self.get("/admin/api-configs").await.decode_field("api_configs")
    }

    /// Registers a new external service
    ///
    /// The service name, display name and type are required.
    pub async fn create_api_config(&self, input: &ApiConfigInput) -> Result<ApiConfig, ApiError> {
        if !input.has_required_fields() {
            return Err(ApiError::InvalidRequest(
                "service_name, service_display_name and service_type are required".to_string(),
            ));
        }

        let request = ApiRequest::new(Method::POST, "/admin/api-configs").with_json(input)?;
        let config: ApiConfig = self.request(request).await.decode_field("config")?;
        info!(service = %config.service_name, "API configuration created");
        Ok(config)
    }

    /// Updates the fields that are set on `input`
    pub async fn update_api_config(&self, config_id: &str, input: &ApiConfigInput) -> Result<ApiConfig, ApiError> {
        let request = ApiRequest::new(Method::PUT, format!("/admin/api-configs/{}", segment(config_id)))
            .with_json(input)?;
        self.request(request).await.decode_field("config")
    }

    /// Active task costs
    pub async fn task_credit_costs(&self) -> Result<Vec<TaskCreditCost>, ApiError> {
        self.get("/admin/task-credit-costs").await.decode_field("costs")
    }

    pub async fn update_task_credit_cost(
        &self,
        cost_id: &str,
        update: &TaskCreditCostUpdate,
    ) -> Result<TaskCreditCost, ApiError> {
        if update.base_cost.is_some_and(|cost| cost < 0) {
            return Err(ApiError::InvalidRequest("Base cost cannot be negative".to_string()));
        }

        let request = ApiRequest::new(Method::PUT, format!("/admin/task-credit-costs/{}", segment(cost_id)))
            .with_json(update)?;
        let cost: TaskCreditCost = self.request(request).await.decode_field("cost")?;
        info!(task_type = %cost.task_type, base_cost = cost.base_cost, "Task credit cost updated");
        Ok(cost)
    }

    /// Feature and external API usage for the last `days` days
    pub async fn usage_analytics(&self, days: u32) -> Result<UsageAnalytics, ApiError> {
        let path = with_query("/admin/analytics/usage", &[("days", Some(days.max(1).to_string()))]);
        self.get(&path).await.decode()
    }
}
