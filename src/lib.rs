//! Remote video-generation job client
//!
//! This library drives asynchronous generation jobs against a remote API:
//! submit a request, poll it on a fixed budget while re-reading the API key
//! before every call, and download the finished artifact. A small axum host
//! service exposes the client to a production console.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
