//! CSRF middleware tests.

mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;

use common::{create_test_app, csrf_cookie, location, login, response_cookie, ADMIN};
use site_security_core::http::security::csrf::{DEFAULT_CSRF_COOKIE_NAME, DEFAULT_CSRF_HEADER_NAME};

#[actix_web::test]
async fn test_get_needs_no_token() {
    let app = create_test_app().await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_login_page_carries_token() {
    let app = create_test_app().await;

    let req = test::TestRequest::get().uri("/login").to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).unwrap();
    assert_eq!(cookie.path(), Some("/"));
    assert_ne!(cookie.http_only(), Some(true));

    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains(&format!("name=\"_csrf\" value=\"{}\"", cookie.value())));
}

#[actix_web::test]
async fn test_existing_token_not_reissued() {
    let app = create_test_app().await;
    let csrf = csrf_cookie(&app).await;

    let req = test::TestRequest::get().uri("/login").cookie(csrf).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).is_none());
}

#[actix_web::test]
async fn test_post_without_token_forbidden() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "viewer@site.test"), ("password", "viewer-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).is_some());
}

#[actix_web::test]
async fn test_post_with_wrong_token_forbidden() {
    let app = create_test_app().await;
    let csrf = csrf_cookie(&app).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(csrf)
        .set_form([("email", "viewer@site.test"), ("password", "viewer-pass"), ("_csrf", "forged")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).is_none());
}

#[actix_web::test]
async fn test_token_cookie_alone_is_not_enough() {
    let app = create_test_app().await;
    let csrf = csrf_cookie(&app).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(csrf)
        .set_form([("email", "viewer@site.test"), ("password", "viewer-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_header_token_accepted() {
    let app = create_test_app().await;
    let csrf = csrf_cookie(&app).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(csrf.clone())
        .insert_header((DEFAULT_CSRF_HEADER_NAME, csrf.value()))
        .set_form([("email", "viewer@site.test"), ("password", "viewer-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/v"));
}

#[actix_web::test]
async fn test_swagger_referer_exempt() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/login")
        .insert_header(("Referer", "https://site.test/swagger-ui/index.html"))
        .set_form([("email", "viewer@site.test"), ("password", "wrong")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/login?error=1"));
}

#[actix_web::test]
async fn test_other_referer_not_exempt() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/login")
        .insert_header(("Referer", "https://site.test/other"))
        .set_form([("email", "viewer@site.test"), ("password", "viewer-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_ignored_path_skips_csrf() {
    let app = create_test_app().await;

    let req = test::TestRequest::post().uri("/static/upload").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).is_none());
}

#[actix_web::test]
async fn test_post_logout_requires_token() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/logout")
        .cookie(Cookie::new(DEFAULT_CSRF_COOKIE_NAME, "known"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_csrf_checked_before_authorization() {
    let app = create_test_app().await;

    // Anonymous callers would be sent to the login page; the token check answers first.
    let req = test::TestRequest::post().uri("/v/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(location(&resp).is_none());
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("403 Access denied"));
}

#[actix_web::test]
async fn test_signed_in_post_without_token_forbidden() {
    let app = create_test_app().await;
    let session = login(&app, ADMIN).await;

    let req = test::TestRequest::post().uri("/v/users").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_encoded_paths_keep_csrf_rules() {
    let app = create_test_app().await;

    let req = test::TestRequest::post().uri("/%76/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(location(&resp).is_none());

    let req = test::TestRequest::post().uri("/%69mages/upload").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).is_none());
}
