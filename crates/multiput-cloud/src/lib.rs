//! # multiput-cloud
//!
//! Amazon S3 backend for multiput. [`S3Store`] implements the
//! [`MultipartStore`](multiput_core::MultipartStore) capability surface on top
//! of the official AWS SDK, so the upload engine and the status query can run
//! against any S3-compatible bucket.
//!
//! The client configuration is built once per invocation from [`S3Settings`]:
//! a named profile or the default credential chain, a region, and an optional
//! endpoint override. No credential state is kept globally.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod error;
mod runtime;
mod store;

pub use runtime::build_runtime;
pub use store::{S3Settings, S3Store};
