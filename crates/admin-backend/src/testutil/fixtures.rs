//! Test fixtures
//!
//! Backend payloads shaped like the admin API's responses.

use serde_json::{json, Value};

pub fn dashboard_json() -> Value {
    json!({
        "users": {"total": 120, "active": 100, "new_today": 4},
        "subscriptions": {"active": 30, "total_revenue": 1499.5},
        "tasks": {"total": 200, "completed": 150, "pending": 40, "failed": 10},
        "content": {"total": 80, "published": 60},
        "credits": {"total_used": 9000},
        "api": {"total_requests": 1000, "errors": 20, "success_rate": 98.0}
    })
}

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": "sara@example.com",
        "full_name": "Sara Nabil",
        "is_active": true,
        "is_admin": false,
        "credits_balance": 340,
        "subscription_status": "premium",
        "subscription_expires_at": "2025-01-31T00:00:00",
        "has_active_subscription": true,
        "subscription_days_remaining": 12,
        "created_at": "2024-03-02T08:15:00.250000",
        "language": "ar"
    })
}

pub fn pagination_json(page: u32, per_page: u32, total: u64) -> Value {
    let pages = total.div_ceil(u64::from(per_page.max(1)));
    json!({
        "page": page,
        "per_page": per_page,
        "total": total,
        "pages": pages,
        "has_next": u64::from(page) < pages,
        "has_prev": page > 1
    })
}

pub fn user_page_json() -> Value {
    json!({
        "users": [user_json("u-1")],
        "pagination": pagination_json(1, 20, 1)
    })
}

pub fn api_key_json(id: i64, service: &str, active: bool) -> Value {
    json!({
        "id": id,
        "service_name": service,
        "endpoint_url": format!("https://{service}.example.com/v1"),
        "is_active": active,
        "usage_count": 42,
        "last_used": "2024-05-01T10:30:00.123456",
        "rate_limit_per_minute": 60,
        "rate_limit_per_day": 1000,
        "monthly_quota": null,
        "quota_used": 0,
        "created_at": "2024-01-01T00:00:00",
        "updated_at": "2024-05-01T10:30:00"
    })
}

pub fn usage_log_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "api_key_id": 1,
        "user_id": "u-1",
        "request_type": "image",
        "request_data": {"prompt": "sunset"},
        "response_status": status,
        "response_time_ms": 830,
        "tokens_used": null,
        "cost_credits": 2.0,
        "error_message": null,
        "created_at": "2024-05-01T10:30:00"
    })
}

pub fn system_health_json() -> Value {
    json!({
        "success": true,
        "health": {
            "timestamp": "2024-05-01T10:30:00.000001",
            "status": "healthy",
            "components": {
                "database": {"status": "healthy", "message": "Database connection OK"},
                "cache": {"status": "healthy", "message": "Cache type: redis"}
            }
        }
    })
}
