//! Routes every visitor can reach.

use std::collections::HashMap;

use actix_session::Session;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use site_security_core::http::security::{DaoAuthenticationProvider, FormLoginService, OptionalPrincipal, SecurityExt};

use super::{escape_html, html_page};
use crate::security::{PASSWORD_PARAMETER, USERNAME_PARAMETER};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
}

#[get("/")]
pub async fn index(principal: OptionalPrincipal) -> impl Responder {
    let greeting = match principal.as_ref() {
        Some(p) => format!(
            "<p>Signed in as {}.</p>\n<a href=\"/v\">Continue</a> | <a href=\"/logout\">Sign out</a>",
            escape_html(p.get_username())
        ),
        None => "<p>Welcome.</p>\n<a href=\"/login\">Sign in</a>".to_string(),
    };
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_page("Home", &greeting))
}

/// Login form. The hidden `_csrf` field carries the request's token.
#[get("/login")]
pub async fn login_page(req: HttpRequest, query: web::Query<LoginQuery>) -> impl Responder {
    let mut body = String::from("<h1>Sign in</h1>\n");
    if query.error.is_some() {
        body.push_str("<p class=\"error\">Invalid e-mail or password.</p>\n");
    }
    if query.logout.is_some() {
        body.push_str("<p class=\"info\">You have been signed out.</p>\n");
    }

    let csrf_field = req
        .csrf_token()
        .map(|token| {
            format!(
                "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(token.parameter_name()),
                escape_html(token.value())
            )
        })
        .unwrap_or_default();

    body.push_str(&format!(
        "<form method=\"post\" action=\"/login\">\n    \
         <input type=\"email\" name=\"{}\" placeholder=\"E-mail\">\n    \
         <input type=\"password\" name=\"{}\" placeholder=\"Password\">\n\
         {}    <button type=\"submit\">Sign in</button>\n</form>",
        USERNAME_PARAMETER, PASSWORD_PARAMETER, csrf_field
    ));

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_page("Sign in", &body))
}

#[post("/login")]
pub async fn login(
    session: Session,
    form: web::Form<HashMap<String, String>>,
    service: web::Data<FormLoginService<DaoAuthenticationProvider>>,
) -> impl Responder {
    service.attempt_authentication(&session, &form).await
}
