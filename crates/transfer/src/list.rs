//! Directory name listing.

use finfetch_client::Session;
use tracing::debug;

use crate::error::TransferError;

/// Lists file names in the session's current remote directory.
///
/// Issues a name listing, decodes the response as text, and returns the
/// names in server order.
pub async fn list_names(session: &mut Session) -> Result<Vec<String>, TransferError> {
    let transport = session.transport_mut()?;
    let raw = transport.name_list().await?;
    let names = split_name_list(&raw);
    debug!(count = names.len(), "listed remote directory");
    Ok(names)
}

/// Splits a raw name-listing response into file names.
///
/// Lines are terminated by CRLF; empty segments (trailing terminators,
/// blank lines, lone CR or LF) are dropped. Decoding is lossy for
/// non-UTF-8 bytes.
pub fn split_name_list(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
