use crate::channel::ChannelError;
use chrono::Utc;
use getrandom::getrandom;
use std::fmt::Write as _;

const TOKEN_BYTES: usize = 16;

/// Builds a fresh stream name: `YYYY/MM/DD/[<qualifier>]<32-hex-token>`.
/// The random token is what keeps concurrent and retried invocations from
/// ever sharing a stream; the date segment keeps streams browsable by day.
pub fn build_stream_name(qualifier: &str) -> Result<String, ChannelError> {
    let date = Utc::now().format("%Y/%m/%d");
    let token = random_hex_token()?;
    Ok(format!("{date}/[{qualifier}]{token}"))
}

fn random_hex_token() -> Result<String, ChannelError> {
    let mut bytes = [0_u8; TOKEN_BYTES];
    getrandom(&mut bytes).map_err(|err| ChannelError::TokenGeneration(err.to_string()))?;
    let mut token = String::with_capacity(TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    Ok(token)
}
