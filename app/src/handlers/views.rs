//! Pages behind the `VIEW` and `ADMIN` roles.

use actix_web::{get, web, HttpResponse, Responder};

use site_security_core::http::security::{AuthenticatedPrincipal, InMemoryUserDetailsService, Role};

use super::{escape_html, html_page};

#[get("/v")]
pub async fn home(principal: AuthenticatedPrincipal) -> impl Responder {
    let mut body = format!("<h1>Hello, {}</h1>\n<ul>\n", escape_html(principal.get_username()));
    if principal.has_role(Role::Admin) {
        body.push_str("    <li><a href=\"/v/users\">Users</a></li>\n");
    }
    body.push_str("    <li><a href=\"/swagger-ui.html\">API documentation</a></li>\n");
    body.push_str("    <li><a href=\"/logout\">Sign out</a></li>\n</ul>");

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_page("Home", &body))
}

#[get("/v/users")]
pub async fn users(users: web::Data<InMemoryUserDetailsService>) -> impl Responder {
    let items: String = users
        .emails()
        .into_iter()
        .map(|email| format!("    <li>{}</li>\n", escape_html(email)))
        .collect();
    let body = format!("<h1>Users ({})</h1>\n<ul>\n{}</ul>", users.len(), items);

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_page("Users", &body))
}
