//! Route handlers, grouped by the access rule that covers them.

use actix_web::web;

pub mod docs;
pub mod public;
pub mod views;

/// Registers every route of the site.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(public::index)
        .service(public::login_page)
        .service(public::login)
        .service(views::home)
        .service(views::users)
        .service(docs::api_docs)
        .service(docs::swagger_ui_html)
        .service(docs::swagger_ui_index);
}

/// Escapes text for HTML element and attribute content.
pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n{}\n</body>\n</html>",
        escape_html(title),
        body
    )
}
