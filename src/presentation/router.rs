// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{ai, fleet, generator, health_check, telemetry};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.model_store.max_bytes().saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/sites", get(fleet::list_sites).post(fleet::create_site))
        .route("/api/sites/:id", get(fleet::get_site))
        .route("/api/sites/:id/machines", get(fleet::site_machines))
        .route("/api/machines", get(fleet::list_machines).post(fleet::create_machine))
        .route("/api/machines/:id", get(fleet::get_machine).patch(fleet::update_machine))
        .route("/api/machines/:id/alerts", get(fleet::machine_alerts))
        .route("/api/machines/:id/maintenance", get(fleet::maintenance_history))
        .route("/api/machines/:id/telemetry", get(telemetry::machine_telemetry))
        .route("/api/machines/:id/cnc-telemetry", get(telemetry::cnc_telemetry))
        .route("/api/machines/:id/cnc-telemetry/all", get(telemetry::all_cnc_telemetry))
        .route("/api/machines/:id/cnc-telemetry/export", get(telemetry::export_cnc_telemetry))
        .route("/api/machines/:id/ai-models", get(ai::machine_models))
        .route("/api/machines/:id/ai-models/active", get(ai::active_machine_model))
        .route("/api/machines/:id/ai-insights", get(ai::machine_insights))
        .route("/api/machines/:id/ai/predict", post(ai::predict))
        .route("/api/machines/:id/ai/status", get(ai::ai_status))
        .route("/api/alerts", get(fleet::list_alerts).post(fleet::create_alert))
        .route("/api/alerts/:id", patch(fleet::acknowledge_alert))
        .route("/api/maintenance", post(fleet::create_maintenance))
        .route("/api/telemetry", post(telemetry::create_telemetry))
        .route("/api/cnc-telemetry", post(telemetry::create_cnc_telemetry))
        .route("/api/ai-models", get(ai::list_models).post(ai::create_model))
        .route(
            "/api/ai-models/:id",
            get(ai::get_model).patch(ai::update_model).delete(ai::delete_model),
        )
        .route(
            "/api/ai-models/:id/upload",
            post(ai::upload_model_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/ai-models/:id/activate", patch(ai::activate_model))
        .route("/api/ai-insights", get(ai::list_insights).post(ai::create_insight))
        .route("/api/ai-insights/:id/acknowledge", patch(ai::acknowledge_insight))
        .route("/api/cnc-generator", get(generator::generator_status))
        .route("/api/cnc-generator/start", post(generator::start_generator))
        .route("/api/cnc-generator/stop", post(generator::stop_generator))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ai_service::AiService;
    use crate::application::ai_service::tests::StubPredictor;
    use crate::application::fleet_service::FleetService;
    use crate::application::generation_service::{CncDataGenerator, GeneratorSettings};
    use crate::application::seed::{DEMO_MACHINE_KEY, seed_cnc_machine};
    use crate::application::telemetry_service::TelemetryService;
    use crate::infrastructure::http_response::XLSX_CONTENT_TYPE;
    use crate::infrastructure::model_storage::ModelFileStore;
    use crate::infrastructure::sqlite_repository::SqliteRepository;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _uploads: TempDir,
    }

    async fn app_with_limit(max_bytes: usize) -> TestApp {
        let repo = Arc::new(SqliteRepository::in_memory().await.unwrap());
        seed_cnc_machine(repo.as_ref(), DEMO_MACHINE_KEY).await.unwrap();

        let uploads = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            fleet_service: FleetService::new(repo.clone()),
            telemetry_service: TelemetryService::new(repo.clone()),
            ai_service: AiService::new(repo.clone(), Arc::new(StubPredictor::default())),
            generator: Arc::new(CncDataGenerator::new(
                repo.clone(),
                GeneratorSettings {
                    machine_key: DEMO_MACHINE_KEY.to_string(),
                    interval: Duration::from_secs(5),
                    seed: Some(3),
                },
            )),
            model_store: ModelFileStore::new(uploads.path(), max_bytes).await.unwrap(),
        });

        TestApp {
            router: build_router(state),
            _uploads: uploads,
        }
    }

    async fn app() -> TestApp {
        app_with_limit(1024 * 1024).await
    }

    impl TestApp {
        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(value) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            let response = self.router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }

        async fn upload(&self, model_id: i64, file_name: &str, contents: &[u8]) -> (StatusCode, Value) {
            let mut body = Vec::new();
            body.extend_from_slice(b"--XBOUNDARY\r\n");
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"model\"; filename=\"{}\"\r\n",
                    file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

            let request = Request::builder()
                .method(Method::POST)
                .uri(format!("/api/ai-models/{}/upload", model_id))
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                .body(Body::from(body))
                .unwrap();
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    fn cnc_body(machine_id: i64, part_count: u32) -> Value {
        json!({
            "machineId": machine_id,
            "spindleSpeed": 8123.5,
            "spindleLoad": 42.0,
            "feedRate": 201.3,
            "coolantTemp": 25.4,
            "coolantPressure": 79.9,
            "xAxisPosition": 312.004,
            "yAxisPosition": 91.25,
            "zAxisPosition": -12.5,
            "vibrationX": 0.42,
            "vibrationY": 0.39,
            "vibrationZ": 0.27,
            "powerConsumption": 15.36,
            "toolNumber": 4,
            "programNumber": 1001,
            "partCount": part_count,
            "cycleTime": 22.5
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_seeded_machine_is_listed() {
        let app = app().await;
        let (status, body) = app.send(Method::GET, "/api/machines", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["machineId"], DEMO_MACHINE_KEY);
        assert_eq!(body[0]["type"], "cnc_mill");

        let site_id = body[0]["siteId"].as_i64().unwrap();
        let (status, machines) = app.send(Method::GET, &format!("/api/sites/{}/machines", site_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(machines.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_bodies_and_missing_entities() {
        let app = app().await;

        let (status, body) = app.send(Method::POST, "/api/sites", Some(json!({ "location": "B" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid site data" }));

        let (status, body) = app.send(Method::GET, "/api/machines/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Machine not found" }));

        let (status, body) = app.send(Method::GET, "/api/ai-models/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "AI model not found");
    }

    #[tokio::test]
    async fn test_dangling_references_are_bad_requests() {
        let app = app().await;

        let (status, body) = app
            .send(Method::PATCH, "/api/machines/1", Some(json!({ "siteId": 999 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid update data" }));

        let (status, body) = app
            .send(
                Method::POST,
                "/api/ai-insights",
                Some(json!({
                    "machineId": 1,
                    "modelId": 999,
                    "insightType": "anomaly",
                    "severity": "warning",
                    "title": "Vibration spike",
                    "description": "Z axis above baseline"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid AI insight data" }));
    }

    #[tokio::test]
    async fn test_huge_insight_limit_is_accepted() {
        let app = app().await;
        let (status, body) = app
            .send(Method::GET, "/api/ai-insights?limit=18446744073709551615", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_machine_crud_and_alerts() {
        let app = app().await;

        let (status, site) = app
            .send(Method::POST, "/api/sites", Some(json!({ "name": "Plant 2" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, machine) = app
            .send(
                Method::POST,
                "/api/machines",
                Some(json!({
                    "machineId": "DMG-5X-002",
                    "name": "DMG Mori 5-axis",
                    "type": "cnc_mill",
                    "siteId": site["id"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(machine["status"], "offline");
        let id = machine["id"].as_i64().unwrap();

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!("/api/machines/{}", id),
                Some(json!({ "status": "maintenance", "firmware": "2.1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "maintenance");
        assert_eq!(updated["firmware"], "2.1");
        assert_eq!(updated["name"], "DMG Mori 5-axis");

        let (status, alert) = app
            .send(
                Method::POST,
                "/api/alerts",
                Some(json!({
                    "machineId": id,
                    "severity": "critical",
                    "title": "Spindle overheating",
                    "message": "Coolant flow low"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(alert["acknowledged"], false);

        let (status, acked) = app
            .send(
                Method::PATCH,
                &format!("/api/alerts/{}", alert["id"]),
                Some(json!({ "acknowledged": true, "assignedTo": "night shift" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(acked["acknowledged"], true);
        assert_eq!(acked["assignedTo"], "night shift");

        let (_, alerts) = app.send(Method::GET, &format!("/api/machines/{}/alerts", id), None).await;
        assert_eq!(alerts.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cnc_telemetry_listing_and_export() {
        let app = app().await;

        let (status, _) = app.send(Method::GET, "/api/machines/1/cnc-telemetry/export", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for part_count in [1, 2, 3] {
            let (status, record) = app
                .send(Method::POST, "/api/cnc-telemetry", Some(cnc_body(1, part_count)))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(record["partCount"], part_count);
        }

        let (_, recent) = app.send(Method::GET, "/api/machines/1/cnc-telemetry?limit=2", None).await;
        let recent: Vec<i64> = recent
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["partCount"].as_i64().unwrap())
            .collect();
        assert_eq!(recent, vec![3, 2]);

        let (_, all) = app.send(Method::GET, "/api/machines/1/cnc-telemetry/all", None).await;
        assert_eq!(all[0]["partCount"], 1);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/machines/1/cnc-telemetry/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=cnc_telemetry_data.xlsx"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_model_upload_activation_and_delete() {
        let app = app().await;

        let (status, model) = app
            .send(
                Method::POST,
                "/api/ai-models",
                Some(json!({ "machineId": 1, "name": "Tool wear", "modelType": "regression" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(model["status"], "pending");
        assert_eq!(model["version"], "1.0.0");
        let id = model["id"].as_i64().unwrap();

        let (status, body) = app.upload(id, "wear.exe", b"MZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid file type. Allowed: .pkl, .h5, .onnx, .pt, .joblib, .json"
        );

        let (status, uploaded) = app.upload(id, "wear.onnx", b"ONNXDATA").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(uploaded["status"], "uploaded");
        assert_eq!(uploaded["fileName"], "wear.onnx");
        assert_eq!(uploaded["fileSize"], 8);
        let path = uploaded["filePath"].as_str().unwrap().to_string();
        assert!(std::path::Path::new(&path).exists());

        let (status, active) = app
            .send(Method::PATCH, &format!("/api/ai-models/{}/activate", id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(active["status"], "active");

        let (_, ai_status) = app.send(Method::GET, "/api/machines/1/ai/status", None).await;
        assert_eq!(ai_status["hasActiveModel"], true);
        assert_eq!(ai_status["totalModels"], 1);
        assert_eq!(ai_status["modelStatus"], "active");

        let (status, body) = app.send(Method::DELETE, &format!("/api/ai-models/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        assert!(!std::path::Path::new(&path).exists());

        let (status, _) = app.send(Method::DELETE, &format!("/api/ai-models/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let app = app_with_limit(4).await;
        let (_, model) = app
            .send(
                Method::POST,
                "/api/ai-models",
                Some(json!({ "machineId": 1, "name": "Big", "modelType": "cnn" })),
            )
            .await;

        let (status, _) = app.upload(model["id"].as_i64().unwrap(), "big.h5", b"0123456789").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_predict_paths() {
        let app = app().await;

        let (status, _) = app.send(Method::POST, "/api/machines/42/ai/predict", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.send(Method::POST, "/api/machines/1/ai/predict", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No telemetry data available for prediction");

        app.send(Method::POST, "/api/cnc-telemetry", Some(cnc_body(1, 5))).await;
        let (status, neutral) = app.send(Method::POST, "/api/machines/1/ai/predict", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(neutral["healthScore"], 1.0);
        assert_eq!(neutral["insights"], json!([]));

        let (_, model) = app
            .send(
                Method::POST,
                "/api/ai-models",
                Some(json!({ "machineId": 1, "name": "Anomaly", "modelType": "isolation_forest" })),
            )
            .await;
        app.send(Method::PATCH, &format!("/api/ai-models/{}/activate", model["id"]), None)
            .await;

        let (status, scored) = app.send(Method::POST, "/api/machines/1/ai/predict", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scored["healthScore"], 0.62);

        let (_, insights) = app.send(Method::GET, "/api/ai-insights?machineId=1", None).await;
        let insights = insights.as_array().unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0]["severity"], "warning");

        let (status, acked) = app
            .send(
                Method::PATCH,
                &format!("/api/ai-insights/{}/acknowledge", insights[0]["id"]),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(acked["acknowledged"], true);
    }

    #[tokio::test]
    async fn test_generator_control() {
        let app = app().await;

        let (_, status) = app.send(Method::GET, "/api/cnc-generator", None).await;
        assert_eq!(status, json!({ "running": false, "machineId": DEMO_MACHINE_KEY }));

        let (_, started) = app.send(Method::POST, "/api/cnc-generator/start", None).await;
        assert_eq!(started["running"], true);

        let (_, stopped) = app.send(Method::POST, "/api/cnc-generator/stop", None).await;
        assert_eq!(stopped["running"], false);
    }
}
