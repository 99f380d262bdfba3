use reqwest::Method;
use tracing::{debug, info};

use super::types::{
    CreditAdjustment, CreditAdjustmentResult, CreditPackage, DashboardStats, FeatureToggle,
    FeatureToggleUpdate, SubscriptionPlan, UserDetail, UserPage, UserQuery,
};
use super::{segment, with_query};
use crate::api::{ApiClient, ApiError, ApiRequest, HttpClient};

// Dashboard, user and catalog endpoints
impl<H: HttpClient> ApiClient<H> {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get("/admin/dashboard").await.decode()
    }

    /// Gets one page of users, optionally filtered by a search term
    pub async fn list_users(&self, query: &UserQuery) -> Result<UserPage, ApiError> {
        let path = with_query(
            "/admin/users",
            &[
                ("page", Some(query.page.max(1).to_string())),
                ("per_page", Some(query.per_page.max(1).to_string())),
                ("search", query.search.clone().filter(|s| !s.is_empty())),
            ],
        );
        self.get(&path).await.decode()
    }

    pub async fn user_detail(&self, user_id: &str) -> Result<UserDetail, ApiError> {
        self.get(&format!("/admin/users/{}", segment(user_id)))
            .await
            .decode()
    }

    /// Grants or deducts credits
    ///
    /// A zero amount is rejected before any request is sent.
    pub async fn adjust_credits(
        &self,
        user_id: &str,
        adjustment: &CreditAdjustment,
    ) -> Result<CreditAdjustmentResult, ApiError> {
        if adjustment.amount == 0 {
            return Err(ApiError::InvalidRequest("Amount cannot be zero".to_string()));
        }

        let request = ApiRequest::new(Method::POST, format!("/admin/users/{}/credits", segment(user_id)))
            .with_json(adjustment)?;

        let result: CreditAdjustmentResult = self.request(request).await.decode()?;
        info!(user_id = %user_id, amount = adjustment.amount, "Adjusted user credits");
        Ok(result)
    }

    pub async fn subscription_plans(&self) -> Result<Vec<SubscriptionPlan>, ApiError> {
        self.get("/admin/subscription-plans").await.decode_field("plans")
    }

    pub async fn credit_packages(&self) -> Result<Vec<CreditPackage>, ApiError> {
        self.get("/admin/credit-packages").await.decode_field("packages")
    }

    pub async fn feature_toggles(&self) -> Result<Vec<FeatureToggle>, ApiError> {
        self.get("/admin/feature-toggles").await.decode_field("features")
    }

    pub async fn update_feature_toggle(
        &self,
        feature_id: &str,
        update: &FeatureToggleUpdate,
    ) -> Result<FeatureToggle, ApiError> {
        debug!(feature_id = %feature_id, "Updating feature toggle");
        let request = ApiRequest::new(Method::PUT, format!("/admin/feature-toggles/{}", segment(feature_id)))
            .with_json(update)?;

        self.request(request).await.decode_field("feature")
    }
}
