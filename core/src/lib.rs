//! # Site Security Core
//!
//! Request security for the site, built on Actix Web: Ant-style access rules,
//! CSRF protection with a cookie token repository, form login backed by a
//! BCrypt DAO provider, and session-based logout.
//!
//! Everything lives under [`http::security`]; error types are in [`http::error`].

pub mod http;
