/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Error types for the clashbot crate.
//!
//! Every failure the orchestrator can observe is reduced to an [`ErrorClass`]
//! before it is recorded, so that session or validation problems on the
//! service side can be told apart from transient network trouble.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used when recording failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service rejected the request (4xx, unexpected payload shape).
    ClientSide,
    /// Anything else: transport failures, 5xx, local I/O.
    Generic,
}

/// Errors raised by a [`crate::ContestClient`] implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("unexpected payload from {endpoint}: {message}")]
    UnexpectedPayload { endpoint: String, message: String },
}

impl ClientError {
    /// Classifies the error for outcome recording.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Status { status, .. } if (400..500).contains(status) => {
                ErrorClass::ClientSide
            }
            ClientError::UnexpectedPayload { .. } => ErrorClass::ClientSide,
            _ => ErrorClass::Generic,
        }
    }
}

/// Errors raised by the durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single orchestrator stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StageError::Client(err) => err.class(),
            StageError::Store(_) => ErrorClass::Generic,
        }
    }
}

/// Configuration errors. Missing credentials are the only fatal condition
/// at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}
