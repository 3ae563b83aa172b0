//! Response body helpers.

use futures_util::StreamExt;

/// Error bodies are kept for diagnostics only; anything past this is cut.
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Read a response body, truncating after [`MAX_ERROR_BODY_BYTES`].
///
/// Stream errors end the read early with whatever arrived so far.
pub(crate) async fn read_capped(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            return format!("{}...(truncated)", String::from_utf8_lossy(&body));
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
