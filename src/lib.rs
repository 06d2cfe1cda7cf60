//! Relay - a three-service message pipeline over RabbitMQ
//!
//! A publisher accepts messages over HTTP and puts them on a queue, a
//! consumer keeps every delivered message in memory and reports them over
//! HTTP, and a dashboard polls that report and renders it as a web page.

pub mod api;
pub mod broker;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod dashboard;
pub mod logging;
pub mod publisher;
pub mod retry;
pub mod telemetry;
