//! Binary encoding for inline request parts.
//!
//! Model APIs take binary attachments as base64 strings inside the JSON
//! request body. PDFs are sent as-is (no re-rendering) so the model sees
//! the original layout, text layer and figures.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Base64-encode a binary payload for an inline-data part.
pub fn encode_inline(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}
