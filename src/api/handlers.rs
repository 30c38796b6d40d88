use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::OpenApi;
use uuid::Uuid;

use super::{
    dto::{CreateDeviceRequest, DeviceDto, SetStatusRequest, UpdateSettingsRequest},
    errors::ApiError,
    AppState,
};
use crate::{
    devices::model::{DeviceStatus, DeviceType, NewDevice},
    energy::{
        summary::{RoomUsage, TypeUsage, UsageTotals},
        EnergySummary, Suggestion, SuggestionCategory,
    },
    statistics::CollectionReport,
    store::EnergySnapshot,
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HouseholdParams {
    pub household_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub household_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// List devices, oldest first, optionally restricted to one household.
#[utoipa::path(
    get,
    path = "/devices",
    params(
        ("household_id" = Option<String>, Query, description = "Household to list"),
    ),
    responses(
        (status = 200, description = "Devices", body = Vec<DeviceDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(params): Query<HouseholdParams>,
) -> Result<Json<Vec<DeviceDto>>, ApiError> {
    let devices = state.devices.list(params.household_id.as_deref()).await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

/// Register a device. It starts switched off with no energy consumed.
#[utoipa::path(
    post,
    path = "/devices",
    request_body = CreateDeviceRequest,
    responses(
        (status = 201, description = "Device created", body = DeviceDto),
        (status = 400, description = "Invalid settings or rating"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn create_device(
    State(state): State<AppState>,
    Json(body): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<DeviceDto>), ApiError> {
    let new = NewDevice::try_from(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let device = state.devices.create(new).await?;
    Ok((StatusCode::CREATED, Json(device.into())))
}

#[utoipa::path(
    get,
    path = "/devices/{id}",
    params(("id" = Uuid, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device", body = DeviceDto),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeviceDto>, ApiError> {
    Ok(Json(state.devices.get(id).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/devices/{id}",
    params(("id" = Uuid, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.devices.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip a device on or off, booking the energy of the interval just ended.
#[utoipa::path(
    post,
    path = "/devices/{id}/toggle",
    params(("id" = Uuid, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Updated device", body = DeviceDto),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn toggle_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeviceDto>, ApiError> {
    Ok(Json(state.devices.toggle(id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/devices/{id}/status",
    params(("id" = Uuid, Path, description = "Device ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Updated device", body = DeviceDto),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn set_device_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<DeviceDto>, ApiError> {
    Ok(Json(state.devices.set_status(id, body.status).await?.into()))
}

/// Change brightness, temperature, fan speed or rated power.
#[utoipa::path(
    patch,
    path = "/devices/{id}/settings",
    params(("id" = Uuid, Path, description = "Device ID")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated device", body = DeviceDto),
        (status = 400, description = "Setting invalid or not applicable"),
        (status = 404, description = "Unknown device"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn update_device_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<DeviceDto>, ApiError> {
    Ok(Json(state.devices.update_settings(id, body.into()).await?.into()))
}

// ---------------------------------------------------------------------------
// Suggestions & statistics
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/suggestions",
    params(
        ("household_id" = Option<String>, Query, description = "Household to inspect"),
    ),
    responses(
        (status = 200, description = "Energy-saving suggestions", body = Vec<Suggestion>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn get_suggestions(
    State(state): State<AppState>,
    Query(params): Query<HouseholdParams>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    Ok(Json(state.devices.suggestions(params.household_id.as_deref()).await?))
}

/// Live totals computed from the devices' current state.
#[utoipa::path(
    get,
    path = "/statistics",
    params(
        ("household_id" = Option<String>, Query, description = "Household to summarise"),
    ),
    responses(
        (status = 200, description = "Energy summary", body = EnergySummary),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(params): Query<HouseholdParams>,
) -> Result<Json<EnergySummary>, ApiError> {
    Ok(Json(state.devices.summary(params.household_id.as_deref()).await?))
}

/// Recorded snapshots ordered by `recorded_at ASC`. Optionally filter by time
/// range with `?from=<RFC3339>&to=<RFC3339>`.
#[utoipa::path(
    get,
    path = "/statistics/history",
    params(
        ("household_id" = Option<String>, Query, description = "Household"),
        ("from" = Option<DateTime<Utc>>, Query, description = "Start of time range (RFC3339)"),
        ("to"   = Option<DateTime<Utc>>, Query, description = "End of time range (RFC3339)"),
    ),
    responses(
        (status = 200, description = "Energy snapshots", body = Vec<EnergySnapshot>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn get_statistics_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<EnergySnapshot>>, ApiError> {
    let rows = state
        .statistics
        .history(params.household_id.as_deref(), params.from, params.to)
        .await?;
    Ok(Json(rows))
}

/// Book energy for running devices and record snapshots now.
#[utoipa::path(
    post,
    path = "/statistics/collect",
    responses(
        (status = 200, description = "Collection report", body = CollectionReport),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn collect_statistics(
    State(state): State<AppState>,
) -> Result<Json<CollectionReport>, ApiError> {
    Ok(Json(state.statistics.collect_once().await?))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        list_devices,
        create_device,
        get_device,
        delete_device,
        toggle_device,
        set_device_status,
        update_device_settings,
        get_suggestions,
        get_statistics,
        get_statistics_history,
        collect_statistics,
        health,
    ),
    components(schemas(
        DeviceDto,
        CreateDeviceRequest,
        SetStatusRequest,
        UpdateSettingsRequest,
        DeviceType,
        DeviceStatus,
        Suggestion,
        SuggestionCategory,
        EnergySummary,
        UsageTotals,
        TypeUsage,
        RoomUsage,
        EnergySnapshot,
        CollectionReport,
    )),
    tags(
        (name = "devices", description = "Device registry and state changes"),
        (name = "energy",  description = "Energy statistics and suggestions"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Smart Home Energy API",
        version = "0.1.0",
        description = "Device power and energy estimation for smart homes"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        clock::ManualClock,
        devices::DeviceService,
        energy::PowerModel,
        statistics::StatisticsService,
        store::MemoryStore,
    };

    const HOUR_MS: i64 = 3_600_000;

    fn test_server() -> (TestServer, Arc<ManualClock>) {
        let store = MemoryStore::new();
        let model = Arc::new(PowerModel::default());
        let clock = Arc::new(ManualClock::new(
            chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        ));
        let devices = DeviceService::new(Arc::new(store.clone()), model, clock.clone());
        let state = AppState {
            statistics: StatisticsService::new(devices.clone(), Arc::new(store), 60),
            devices,
        };
        (TestServer::new(router(state)).unwrap(), clock)
    }

    async fn create(server: &TestServer, body: Value) -> Value {
        let resp = server.post("/devices").json(&body).await;
        resp.assert_status(StatusCode::CREATED);
        resp.json()
    }

    fn close(a: &Value, b: f64) -> bool {
        (a.as_f64().unwrap() - b).abs() < 1e-9
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn list_empty_returns_empty_array() {
        let (server, _) = test_server();
        let resp = server.get("/devices").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn create_starts_off_with_zero_energy() {
        let (server, _) = test_server();
        let body = create(
            &server,
            json!({
                "household_id": "home",
                "name": "Desk lamp",
                "room": "office",
                "device_type": "light",
                "base_power_consumption": 60.0,
                "brightness": 80.0
            }),
        )
        .await;

        assert_eq!(body["status"], "off");
        assert_eq!(body["device_type"], "light");
        assert_eq!(body["brightness"], 80.0);
        assert_eq!(body["power_consumption"], 0.0);
        assert_eq!(body["total_energy_consumed"], 0.0);
        assert_eq!(body["room"], "office");
    }

    #[tokio::test]
    async fn create_without_rating_samples_one() {
        let (server, _) = test_server();
        let body = create(
            &server,
            json!({ "household_id": "home", "name": "Fridge", "device_type": "refrigerator" }),
        )
        .await;
        let watts = body["base_power_consumption"].as_f64().unwrap();
        assert!((100.0..=400.0).contains(&watts));
    }

    #[tokio::test]
    async fn create_rejects_foreign_setting() {
        let (server, _) = test_server();
        let resp = server
            .post("/devices")
            .json(&json!({
                "household_id": "home",
                "name": "TV",
                "device_type": "tv",
                "brightness": 50.0
            }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("brightness"));
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_rating() {
        let (server, _) = test_server();
        for watts in [-3.0, 1e300] {
            let resp = server
                .post("/devices")
                .json(&json!({
                    "household_id": "home",
                    "name": "Plug",
                    "device_type": "plug",
                    "base_power_consumption": watts
                }))
                .await;
            resp.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn list_filters_by_household() {
        let (server, _) = test_server();
        for household in ["home", "home", "cabin"] {
            create(
                &server,
                json!({ "household_id": household, "name": "Lock", "device_type": "lock" }),
            )
            .await;
        }
        let resp = server.get("/devices").add_query_param("household_id", "home").await;
        resp.assert_status_ok();
        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 2);
        assert!(body.iter().all(|d| d["household_id"] == "home"));
    }

    #[tokio::test]
    async fn unknown_device_returns_404() {
        let (server, _) = test_server();
        let id = uuid::Uuid::new_v4();
        server.get(&format!("/devices/{id}")).await.assert_status(StatusCode::NOT_FOUND);
        server
            .post(&format!("/devices/{id}/toggle"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/devices/{id}"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggle_on_for_an_hour_books_energy() {
        let (server, clock) = test_server();
        let device = create(
            &server,
            json!({
                "household_id": "home",
                "name": "Lamp",
                "device_type": "light",
                "base_power_consumption": 60.0,
                "brightness": 100.0
            }),
        )
        .await;
        let id = device["id"].as_str().unwrap();

        let on: Value = server.post(&format!("/devices/{id}/toggle")).await.json();
        assert_eq!(on["status"], "on");
        assert!(close(&on["power_consumption"], 60.0));

        clock.advance_millis(HOUR_MS);
        let off: Value = server.post(&format!("/devices/{id}/toggle")).await.json();
        assert_eq!(off["status"], "off");
        assert_eq!(off["power_consumption"], 0.0);
        assert!(close(&off["total_energy_consumed"], 0.06));
    }

    #[tokio::test]
    async fn set_status_explicitly() {
        let (server, _) = test_server();
        let device = create(
            &server,
            json!({ "household_id": "home", "name": "Fan", "device_type": "fan",
                    "base_power_consumption": 60.0, "speed": 3 }),
        )
        .await;
        let id = device["id"].as_str().unwrap();

        let resp = server
            .put(&format!("/devices/{id}/status"))
            .json(&json!({ "status": "on" }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "on");
        assert!(close(&body["power_consumption"], 60.0));
    }

    #[tokio::test]
    async fn settings_change_recomputes_power() {
        let (server, clock) = test_server();
        let device = create(
            &server,
            json!({ "household_id": "home", "name": "Heat pump", "device_type": "thermostat",
                    "base_power_consumption": 1500.0 }),
        )
        .await;
        let id = device["id"].as_str().unwrap();
        server.post(&format!("/devices/{id}/toggle")).await.assert_status_ok();

        clock.advance_millis(HOUR_MS);
        let resp = server
            .patch(&format!("/devices/{id}/settings"))
            .json(&json!({ "temperature": 30.0 }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(close(&body["power_consumption"], 2700.0));
        assert!(close(&body["total_energy_consumed"], 1.5));
        assert_eq!(body["temperature"], 30.0);
    }

    #[tokio::test]
    async fn settings_out_of_range_is_rejected() {
        let (server, _) = test_server();
        let device = create(
            &server,
            json!({ "household_id": "home", "name": "Fan", "device_type": "fan" }),
        )
        .await;
        let id = device["id"].as_str().unwrap();

        let resp = server
            .patch(&format!("/devices/{id}/settings"))
            .json(&json!({ "speed": 7 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        let (server, _) = test_server();
        let device = create(
            &server,
            json!({ "household_id": "home", "name": "Kettle", "device_type": "other" }),
        )
        .await;
        let id = device["id"].as_str().unwrap();
        server
            .delete(&format!("/devices/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.get(&format!("/devices/{id}")).await.assert_status(StatusCode::NOT_FOUND);
    }

    // -----------------------------------------------------------------------
    // Suggestions & statistics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn three_lights_on_suggest_lighting_and_off_peak() {
        let (server, _) = test_server();
        for _ in 0..3 {
            let device = create(
                &server,
                json!({ "household_id": "home", "name": "Light", "device_type": "light" }),
            )
            .await;
            let id = device["id"].as_str().unwrap();
            server.post(&format!("/devices/{id}/toggle")).await.assert_status_ok();
        }

        let resp = server.get("/suggestions").add_query_param("household_id", "home").await;
        resp.assert_status_ok();
        let body: Vec<Value> = resp.json();
        let categories: Vec<&str> = body.iter().map(|s| s["category"].as_str().unwrap()).collect();
        assert_eq!(categories, vec!["lighting", "scheduling"]);
    }

    #[tokio::test]
    async fn statistics_summarise_live_state() {
        let (server, _) = test_server();
        let tv = create(
            &server,
            json!({ "household_id": "home", "name": "TV", "room": "lounge",
                    "device_type": "tv", "base_power_consumption": 120.0 }),
        )
        .await;
        create(
            &server,
            json!({ "household_id": "home", "name": "Lock", "device_type": "lock",
                    "base_power_consumption": 2.0 }),
        )
        .await;
        let id = tv["id"].as_str().unwrap();
        server.post(&format!("/devices/{id}/toggle")).await.assert_status_ok();

        let resp = server.get("/statistics").add_query_param("household_id", "home").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["device_count"], 2);
        assert_eq!(body["active_devices"], 1);
        assert!(close(&body["total_power_watts"], 120.0));
        assert_eq!(body["by_type"].as_array().unwrap().len(), 2);
        assert_eq!(body["by_room"][0]["room"], "lounge");
        assert_eq!(body["by_room"][1]["room"], "unassigned");
    }

    #[tokio::test]
    async fn collect_then_history() {
        let (server, clock) = test_server();
        let device = create(
            &server,
            json!({ "household_id": "home", "name": "Microwave", "device_type": "microwave",
                    "base_power_consumption": 1000.0 }),
        )
        .await;
        let id = device["id"].as_str().unwrap();
        server.post(&format!("/devices/{id}/toggle")).await.assert_status_ok();

        clock.advance_millis(HOUR_MS / 4);
        let resp = server.post("/statistics/collect").await;
        resp.assert_status_ok();
        let report: Value = resp.json();
        assert_eq!(report["devices_updated"], 1);
        assert_eq!(report["snapshots_recorded"], 1);

        let resp = server
            .get("/statistics/history")
            .add_query_param("household_id", "home")
            .await;
        resp.assert_status_ok();
        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 1);
        assert!(close(&body[0]["total_energy_kwh"], 0.25));
    }

    // -----------------------------------------------------------------------
    // System
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn health_returns_ok() {
        let (server, _) = test_server();
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let (server, _) = test_server();
        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Smart Home Energy API");
        assert!(body["paths"]["/devices/{id}/toggle"].is_object());
    }
}
