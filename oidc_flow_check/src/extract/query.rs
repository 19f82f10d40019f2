use std::collections::HashMap;
use url::Url;

use crate::errors::FlowError;

/// Extract exactly the named query parameters from `url`.
///
/// Each name must be present once with a non-empty value; an absent or empty
/// parameter is `MissingParameter` and a repeated one is `AmbiguousParameter`.
/// Errors carry hop 0 until an assertion attributes them to a hop.
pub fn extract_query_params(
    url: &Url,
    names: &[&str],
) -> Result<HashMap<String, String>, FlowError> {
    let mut found = HashMap::with_capacity(names.len());

    for name in names {
        let mut values = url
            .query_pairs()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned());

        match (values.next(), values.next()) {
            (Some(_), Some(_)) => {
                return Err(FlowError::AmbiguousParameter {
                    hop: 0,
                    name: name.to_string(),
                });
            }
            (Some(value), None) if !value.is_empty() => {
                found.insert(name.to_string(), value);
            }
            _ => {
                return Err(FlowError::MissingParameter {
                    hop: 0,
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(found)
}
