//! Solar Storefront - calculator and order tracking service

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use solar_storefront::{Config, ContactInfo, Countdown, CountdownRequest, DeliveryHint, PricingTable, QuoteSummary, SolarInput, SolarResult, SolarSizingEstimator, StorefrontError};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)] pub struct AppState { pub estimator: Arc<SolarSizingEstimator> }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::load()?;
    let estimator = config.estimator()?;
    tracing::info!(components = estimator.pricing().len(), currency = %estimator.settings().local_currency, "pricing table loaded");
    let addr = config.server.socket_addr()?;

    tracing::info!("🚀 Solar Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app(AppState { estimator: Arc::new(estimator) }))
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); tracing::info!("shutdown signal received"); })
        .await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "solar-storefront"})) }))
        .route("/api/v1/solar/pricing", get(pricing))
        .route("/api/v1/solar/estimate", post(estimate))
        .route("/api/v1/solar/quote", post(quote))
        .route("/api/v1/orders/countdown", post(countdown))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: StorefrontError) -> (StatusCode, String) {
    let status = match e {
        StorefrontError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StorefrontError::ConfigurationMissing(_) | StorefrontError::InvalidConfiguration(_) | StorefrontError::CurrencyMismatch(_, _) => {
            tracing::error!(error = %e, "estimator misconfigured");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

async fn pricing(State(s): State<AppState>) -> Json<PricingTable> { Json(s.estimator.pricing().clone()) }

async fn estimate(State(s): State<AppState>, Json(input): Json<SolarInput>) -> Result<Json<SolarResult>, (StatusCode, String)> {
    s.estimator.estimate(&input).map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct QuoteRequest { pub input: SolarInput, pub contact: ContactInfo }

async fn quote(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<(StatusCode, Json<QuoteSummary>), (StatusCode, String)> {
    let result = s.estimator.estimate(&r.input).map_err(reject)?;
    let q = QuoteSummary::issue(&r.input, &result, r.contact, Utc::now()).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(q)))
}

#[derive(Debug, Serialize)] pub struct CountdownResponse { pub countdown: Countdown, pub hint: Option<DeliveryHint> }

async fn countdown(Json(r): Json<CountdownRequest>) -> Json<CountdownResponse> {
    let countdown = r.evaluate(Utc::now());
    let hint = match countdown { Countdown::Running(remaining) => Some(remaining.hint()), _ => None };
    Json(CountdownResponse { countdown, hint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let estimator = Config::load_from("config/default.toml").unwrap().estimator().unwrap();
        app(AppState { estimator: Arc::new(estimator) })
    }

    /// Default configuration with the battery modules removed from the price list.
    fn app_without_batteries() -> Router {
        let mut config = Config::load_from("config/default.toml").unwrap();
        let kept = config.pricing.iter().filter(|(k, _)| !k.as_str().starts_with("battery")).map(|(k, v)| (k.clone(), v.clone()));
        config.pricing = PricingTable::from_components(kept.collect::<Vec<_>>()).unwrap();
        app(AppState { estimator: Arc::new(config.estimator().unwrap()) })
    }

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        post_json_to(test_app(), uri, body).await
    }

    async fn post_json_to(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::post(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    fn form(monthly: f64) -> serde_json::Value {
        serde_json::json!({"monthly_consumption": monthly, "usage_type": "residential", "city": "Khartoum", "sun_hours": 6, "system_type": "hybrid"})
    }

    #[tokio::test]
    async fn test_estimate_endpoint() {
        let (status, body) = post_json("/api/v1/solar/estimate", form(600.0)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["panel_count"], 10);
        assert_eq!(body["battery_count"], 2);
    }

    #[tokio::test]
    async fn test_estimate_rejects_non_positive_consumption() {
        let (status, _) = post_json("/api/v1/solar/estimate", form(0.0)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_estimate_with_missing_price_is_server_error() {
        let (status, _) = post_json_to(app_without_batteries(), "/api/v1/solar/estimate", form(600.0)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let mut on_grid = form(600.0);
        on_grid["system_type"] = "on_grid".into();
        let (status, body) = post_json_to(app_without_batteries(), "/api/v1/solar/estimate", on_grid).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["battery_count"], 0);
    }

    #[tokio::test]
    async fn test_estimate_rejects_oversized_load() {
        let (status, _) = post_json("/api/v1/solar/estimate", form(3e27)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_reject_status_mapping() {
        let cases = [
            (StorefrontError::InvalidInput("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (StorefrontError::InvalidTransition { from: "shipped".into(), to: "confirmed".into() }, StatusCode::CONFLICT),
            (StorefrontError::ConfigurationMissing("battery_5kwh".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StorefrontError::InvalidConfiguration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StorefrontError::CurrencyMismatch("USD".into(), "SDG".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            let message = error.to_string();
            assert_eq!(reject(error), (expected, message));
        }
    }

    #[tokio::test]
    async fn test_quote_endpoint() {
        let body = serde_json::json!({"input": form(600.0), "contact": {"name": "Mazin", "email": "client@example.com", "phone": null}});
        let (status, quote) = post_json("/api/v1/solar/quote", body).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(quote["quote_number"].as_str().unwrap().starts_with("CALC-"));
        assert_eq!(quote["monthly_production_kwh"], 540);
    }

    #[tokio::test]
    async fn test_countdown_endpoint() {
        let created = Utc::now() - chrono::Duration::days(1);
        let body = serde_json::json!({"created_at": created, "estimated_delivery": null, "status": "confirmed"});
        let (status, res) = post_json("/api/v1/orders/countdown", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["countdown"]["state"], "awaiting_schedule");
        assert!(res["hint"].is_null());
    }

    #[tokio::test]
    async fn test_pricing_endpoint() {
        let req = Request::get("/api/v1/solar/pricing").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
