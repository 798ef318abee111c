pub mod auth;
pub mod blobs;
pub mod links;
pub mod logging;
pub mod services;
pub mod social;
pub mod storage;
pub mod web;
