use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

/// Secret env values are encrypted per node by the grid at deploy time; the
/// record the portal keeps only ever stores the base64-wrapped copy used by
/// the secret endpoint.
pub fn encode_secret_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(k, v)| (k.clone(), STANDARD.encode(v)))
        .collect()
}

pub fn decode_secret_env(
    env: &HashMap<String, String>,
) -> Result<HashMap<String, String>, base64::DecodeError> {
    env.iter()
        .map(|(k, v)| {
            let decoded = STANDARD.decode(v)?;
            let value = String::from_utf8(decoded)
                .map_err(|_| base64::DecodeError::InvalidPadding)?;
            Ok((k.clone(), value))
        })
        .collect()
}
