// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod operation_options;
mod procedure_params;

pub use operation_options::*;
pub use procedure_params::*;
