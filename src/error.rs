//! Error types for the raycasting core

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Raycaster error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Grid input was empty or had rows of unequal length
    #[error("Malformed grid: {0}")]
    MalformedGrid(String),

    /// Strict cell query outside the grid
    #[error("Cell ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Column index
        x: i32,
        /// Row index
        y: i32,
    },

    /// Non-positive or non-finite raycast/movement setting
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Config or layout JSON could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
