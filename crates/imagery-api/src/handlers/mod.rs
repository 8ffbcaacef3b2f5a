//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the imagery API.

pub mod downloads;
pub mod health;
pub mod images;
