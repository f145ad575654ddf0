//! Integration tests for cloudsink-api
//!
//! Uses wiremock to simulate the token exchange, metadata and content
//! endpoints and verifies end-to-end behavior of the ApiClient, children
//! listing, folder operations and multipart uploads.

mod common;

mod test_auth;
mod test_upload;
