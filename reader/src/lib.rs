//! Pathreader library
//!
//! Bible reader core: the text API client, local reading state (progress,
//! notes, highlights, preferences) and the search and deep-link logic the
//! reader front end drives.

pub mod app;
pub mod client;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
