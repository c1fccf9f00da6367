#![crate_name = "hashdrop"]

//! hashdrop is a content-adressed file drop server.
//!
//! Authenticated users upload a file and receive a short URL for it. The same content always
//! gets the same URL, and is only stored once.
//!
//! ## Content addressing
//!
//! Uploaded content is stored under the hex of its digest (SHA1 by default, SHA256 and SHA512
//! can be selected). The digest is computed while the content is written to a temporary file,
//! which is then moved into place. A partially received upload never reaches its final path.
//!
//! ## Short hashes
//!
//! The URL handed back to the uploader does not contain the full digest but the shortest prefix
//! of it that is not already taken by other content, with a configurable minimum length. See
//! [db::shorthash](crate::db::shorthash).
//!
//! ## Users
//!
//! Uploads require the credentials of a user created with the `hashdrop_users` tool. See the
//! [auth](crate::auth) module for how secrets are checked.
//!
//! ## Uploading content
//!
//! Content is stored by making `PUT` requests to the server, with the file as the request body.
//! With a server running on `localhost:8000`:
//!
//! ``` ignore,
//! curl -T foo.txt -H 'X-Filename: foo.txt' -u moradi:hunter2 http://localhost:8000/
//! ```
//!
//! responds with a URL like `a999.txt`, which can in turn be retrieved with a `GET`.

/// Authentication of uploading users.
pub mod auth;

/// Digest selection and streaming digest computation.
pub mod digest;

/// Content storage on disk.
pub mod record;

/// Persisted records.
pub mod db;

/// Users and their secrets.
pub mod user;

/// Metadata for stored content.
pub mod meta;

/// Upload and download of content.
pub mod state;

/// Encapsulates an incoming remote request.
pub mod request;

/// Encapsulates an outgoing response to remote.
pub mod response;
