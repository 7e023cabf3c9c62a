//! Wire protocol: one JSON object per line in each direction.
//!
//! A request carries a `function` name with its parameters flattened into
//! the same object; a response carries either `data` or `error`. Pixel
//! buffers travel as `{ "shape": [height, width, channels], "data": base64 }`.

use base64::prelude::*;
use facefit_core::Frame;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Request {
    pub function: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A pixel buffer in wire form.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireImage {
    /// [height, width, channels].
    pub shape: [u32; 3],
    /// Base64 of the raw interleaved pixel bytes.
    pub data: String,
}

impl WireImage {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            shape: [frame.height, frame.width, frame.channels],
            data: BASE64_STANDARD.encode(&frame.data),
        }
    }
}
