use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Header carrying the per-request id back to the client.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs the start and end of every request under a generated request id.
///
/// Client errors are logged at `warn`, server errors at `error`, so a failed
/// generation round stands out from ordinary traffic.
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let remote_addr = req.connection_info().realip_remote_addr().unwrap_or("unknown").to_string();
        let request_id = Uuid::new_v4();

        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            remote_addr = %remote_addr,
            "Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut result = fut.await;
            let duration = start_time.elapsed();

            match &mut result {
                Ok(response) => {
                    let status = response.status();
                    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                        response.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }

                    if status.is_server_error() {
                        error!(
                            request_id = %request_id,
                            method = %method,
                            uri = %uri,
                            status = %status.as_u16(),
                            duration_ms = %duration.as_millis(),
                            "Request completed with server error"
                        );
                    } else if status.is_client_error() {
                        warn!(
                            request_id = %request_id,
                            method = %method,
                            uri = %uri,
                            status = %status.as_u16(),
                            duration_ms = %duration.as_millis(),
                            "Request completed with client error"
                        );
                    } else {
                        info!(
                            request_id = %request_id,
                            method = %method,
                            uri = %uri,
                            remote_addr = %remote_addr,
                            status = %status.as_u16(),
                            duration_ms = %duration.as_millis(),
                            "Request completed"
                        );
                    }
                }
                Err(err) => {
                    error!(
                        request_id = %request_id,
                        method = %method,
                        uri = %uri,
                        remote_addr = %remote_addr,
                        duration_ms = %duration.as_millis(),
                        error = %err,
                        "Request failed"
                    );
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn test_request_id_header_is_set() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogging)
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        let id = resp.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
