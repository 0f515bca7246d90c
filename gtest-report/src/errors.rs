// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while serializing a [`Report`](crate::Report).
#[derive(Debug, Error)]
pub enum SerializeError {
    /// An error occurred while writing XML events.
    #[error("error serializing XML report")]
    Xml(#[from] quick_xml::Error),

    /// The serialized report was not valid UTF-8.
    #[error("serialized report is invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
