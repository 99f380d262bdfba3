use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Largest page size the usage log endpoint serves
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination block shared by list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

// === Dashboard ===

/// Aggregate numbers shown on the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub users: UserStats,
    pub subscriptions: SubscriptionStats,
    pub tasks: TaskStats,
    pub content: ContentStats,
    pub credits: CreditStats,
    pub api: ApiUsageStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub new_today: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionStats {
    pub active: u64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
}

impl TaskStats {
    /// Share of tasks that completed, as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStats {
    pub total: u64,
    pub published: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditStats {
    pub total_used: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiUsageStats {
    pub total_requests: u64,
    pub errors: u64,
    pub success_rate: f64,
}

// === Users ===

/// A user account as listed to admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub credits_balance: i64,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub subscription_expires_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub has_active_subscription: bool,
    #[serde(default)]
    pub subscription_days_remaining: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    /// Profile fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Full name when set, otherwise the email address
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

/// A user with their recent activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    pub user: User,
    #[serde(default)]
    pub subscription: Option<Value>,
    #[serde(default)]
    pub recent_tasks: Vec<Value>,
    #[serde(default)]
    pub credit_history: Vec<CreditTransaction>,
    #[serde(default)]
    pub recent_content: Vec<Value>,
}

/// Filters for the user list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            search: None,
        }
    }
}

// === Credits ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Manual change to a user's credit balance
///
/// Positive amounts grant credits, negative amounts deduct them.
#[derive(Debug, Clone, Serialize)]
pub struct CreditAdjustment {
    pub amount: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreditAdjustment {
    pub fn new(amount: i64, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAdjustmentResult {
    #[serde(default)]
    pub message: Option<String>,
    pub transaction: CreditTransaction,
}

// === Catalog ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price_monthly: f64,
    #[serde(default)]
    pub price_yearly: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub monthly_credits: i64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: String,
    pub name: String,
    pub credits_amount: i64,
    #[serde(default)]
    pub bonus_credits: i64,
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreditPackage {
    /// Credits granted including the bonus
    pub fn total_credits(&self) -> i64 {
        self.credits_amount + self.bonus_credits
    }
}

// === Feature toggles ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureToggle {
    pub id: String,
    pub feature_key: String,
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_beta: bool,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub rollout_percentage: u8,
    #[serde(default)]
    pub min_subscription_level: Option<String>,
    #[serde(default)]
    pub max_daily_usage: Option<i64>,
    #[serde(default)]
    pub max_monthly_usage: Option<i64>,
    #[serde(default)]
    pub configuration: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update of a feature toggle; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureToggleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_beta: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollout_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_daily_usage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_monthly_usage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_subscription_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

// === API keys ===

/// A configured external service key, without its secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub service_name: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub last_used: Option<NaiveDateTime>,
    #[serde(default)]
    pub rate_limit_per_minute: Option<u32>,
    #[serde(default)]
    pub rate_limit_per_day: Option<u32>,
    #[serde(default)]
    pub monthly_quota: Option<u64>,
    #[serde(default)]
    pub quota_used: u64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl ApiKey {
    /// Share of the monthly quota already used, when a quota is set
    pub fn quota_usage(&self) -> Option<f64> {
        match self.monthly_quota {
            Some(quota) if quota > 0 => Some(self.quota_used as f64 / quota as f64 * 100.0),
            _ => None,
        }
    }
}

/// Fields accepted when adding or updating a key
///
/// The key and secret are never printed by `Debug`.
#[derive(Clone, Default, Serialize)]
pub struct ApiKeyInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_config: Option<Value>,
}

impl ApiKeyInput {
    /// Input for a new key; both fields are required by the server
    pub fn new(service_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ApiKeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ApiKeyInput")
            .field("service_name", &self.service_name)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("endpoint_url", &self.endpoint_url)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("rate_limit_per_day", &self.rate_limit_per_day)
            .field("monthly_quota", &self.monthly_quota)
            .finish_non_exhaustive()
    }
}

/// Which generation path a connection test exercises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTestKind {
    #[default]
    Image,
    Video,
    Speech,
}

// === API configurations ===

/// Integration settings for an external service, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub id: String,
    pub service_name: String,
    #[serde(default)]
    pub service_display_name: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_rate_limited: bool,
    #[serde(default)]
    pub rate_limit_per_minute: Option<u32>,
    #[serde(default)]
    pub rate_limit_per_hour: Option<u32>,
    #[serde(default)]
    pub rate_limit_per_day: Option<u32>,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub requests_today: u64,
    #[serde(default)]
    pub cost_per_request: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub last_error_message: Option<String>,
    #[serde(default)]
    pub additional_config: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields accepted when creating or updating an API configuration
///
/// Credentials are write-only and never printed by `Debug`.
#[derive(Clone, Default, Serialize)]
pub struct ApiConfigInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_request: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_config: Option<Value>,
}

impl ApiConfigInput {
    /// Input for a new configuration with the fields the server requires
    pub fn new(
        service_name: impl Into<String>,
        display_name: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            service_name: Some(service_name.into()),
            service_display_name: Some(display_name.into()),
            service_type: Some(service_type.into()),
            ..Self::default()
        }
    }

    pub(crate) fn has_required_fields(&self) -> bool {
        [&self.service_name, &self.service_display_name, &self.service_type]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl fmt::Debug for ApiConfigInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ApiConfigInput")
            .field("service_name", &self.service_name)
            .field("service_type", &self.service_type)
            .field("api_endpoint", &self.api_endpoint)
            .field("is_active", &self.is_active)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish_non_exhaustive()
    }
}

// === Task credit costs ===

/// What one kind of task costs in credits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreditCost {
    pub id: String,
    pub task_type: String,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub task_name_ar: Option<String>,
    pub base_cost: i64,
    /// Per-parameter surcharges, either a flat per-unit number or
    /// `{"per_unit": n}` / `{"tiers": [...]}`
    #[serde(default)]
    pub variable_costs: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update of a task cost
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskCreditCostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_cost: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_costs: Option<Value>,
}

// === Analytics ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureUsage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stats: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUsage {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub stats: Value,
}

/// Feature and external API usage over a window of days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageAnalytics {
    /// Keyed by feature key
    pub feature_usage: BTreeMap<String, FeatureUsage>,
    /// Keyed by service name
    pub api_usage: BTreeMap<String, ServiceUsage>,
}

// === Usage logs ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: i64,
    pub api_key_id: i64,
    #[serde(default)]
    pub user_id: Option<Value>,
    pub request_type: String,
    pub response_status: String,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub cost_credits: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogPage {
    pub logs: Vec<UsageLog>,
    pub pagination: Pagination,
}

/// Filters for the usage log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageLogQuery {
    pub page: u32,
    pub per_page: u32,
    pub service_name: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<String>,
}

impl Default for UsageLogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            service_name: None,
            user_id: None,
            status: None,
        }
    }
}

// === Cache, health and actions ===

/// Which cache entries to drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheClearScope {
    #[default]
    Expired,
    All,
}

/// Health of one backend component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub status: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

impl SystemHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    /// Names of components not reporting healthy
    pub fn unhealthy_components(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(_, c)| c.status != "healthy")
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Outcome of a management action such as clearing the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
