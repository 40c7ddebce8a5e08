// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
// Docs.rs build is done with the nightly compiler, so we can enable nightly features in that build.
// In this case we enable two features:
// - `doc_auto_cfg`: Automatically scans `cfg` attributes and uses them to show those required configurations in the generated documentation.
// - `doc_cfg_hide`: Ignore the `doc` configuration for `doc_auto_cfg`.
// See https://doc.rust-lang.org/rustdoc/unstable-features.html#doc_auto_cfg-automatically-generate-doccfg for more details.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg_hide))]

pub mod connection;
pub mod constants;
mod error;
pub mod models;
pub mod orchestration;
mod options;
mod partition_key;
pub mod resource_link;
mod retry;
mod store;
pub mod transport;

#[doc(inline)]
pub use connection::{ConnectionDescriptor, ConnectionDescriptorBuilder, ConnectionRegistry};
pub use error::{Error, ErrorKind, Result};
pub use options::*;
pub use partition_key::*;
pub use retry::RetryPolicy;
#[doc(inline)]
pub use store::DocumentStore;

pub use stop_token::{StopSource, StopToken};
