use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();
    let credential_configured = !state.credential.is_empty();

    HttpResponse::Ok().json(json!({
        "status": if credential_configured { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "lessons_started": metrics.lessons_started,
            "evaluations_completed": metrics.evaluations_completed
        },
        "memory": get_memory_info(),
        "genai": {
            "credential_configured": credential_configured,
            "models": {
                "text": config.genai.text_model,
                "image": config.genai.image_model,
                "video": config.genai.video_model,
                "speech": config.genai.tts_model
            },
            "voice": config.genai.voice
        },
        "tutor": {
            "loading": state.tutor.is_loading(),
            "audio_context_open": state.tutor.audio().is_open(),
            "history_count": state.tutor.history().len().await,
            "stored_media": state.tutor.media().len().await
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "lessons": {
            "started": metrics.lessons_started,
            "evaluated": metrics.evaluations_completed,
            "open": state.tutor.open_lesson_count().await
        },
        "endpoints": endpoint_stats,
        "memory": get_memory_info()
    }))
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", process::id())) {
            let read_kb = |prefix: &str| {
                status
                    .lines()
                    .find(|line| line.starts_with(prefix))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
                    .unwrap_or(0)
                    * 1024
            };

            return json!({
                "resident_memory_bytes": read_kb("VmRSS:"),
                "virtual_memory_bytes": read_kb("VmSize:"),
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false,
        "note": format!("Memory info not available for process {}", process::id())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::genai::testing::ScriptedBackend;
    use crate::genai::ApiCredential;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health_reports_missing_credential() {
        let state = AppState::with_backend(AppConfig::default(), Arc::new(ScriptedBackend::new()), ApiCredential::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "degraded");
        assert_eq!(body["genai"]["credential_configured"], false);
        assert_eq!(body["genai"]["models"]["speech"], "gemini-2.5-flash-preview-tts");
        assert_eq!(body["tutor"]["audio_context_open"], false);
    }
}
