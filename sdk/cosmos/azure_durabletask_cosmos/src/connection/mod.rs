// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Connection configuration and the process-wide client pool.

mod connection_string;
mod descriptor;
mod registry;

pub use azure_core::credentials::Secret;
pub use connection_string::*;
pub use descriptor::*;
pub use registry::*;
