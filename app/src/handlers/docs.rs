//! API description and the Swagger UI entry points.

use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

/// Machine-readable API description. Served without any security processing.
#[get("/api-docs")]
pub async fn api_docs() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "openapi": "3.0.1",
        "info": { "title": "Site", "version": env!("CARGO_PKG_VERSION") },
        "paths": {
            "/v": { "get": { "summary": "Landing page for VIEW users" } },
            "/v/users": { "get": { "summary": "Account list, ADMIN only" } },
            "/login": {
                "get": { "summary": "Login form" },
                "post": { "summary": "Submit credentials" }
            },
            "/logout": { "get": { "summary": "End the session" } }
        }
    }))
}

fn swagger_page() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(
        "<!DOCTYPE html>\n<html>\n<head><title>Swagger UI</title></head>\n<body>\n    \
         <div id=\"swagger-ui\" data-url=\"/api-docs\"></div>\n</body>\n</html>",
    )
}

#[get("/swagger-ui.html")]
pub async fn swagger_ui_html() -> impl Responder {
    swagger_page()
}

#[get("/swagger-ui/index.html")]
pub async fn swagger_ui_index() -> impl Responder {
    swagger_page()
}
