use crate::{
    common::Item,
    error::{Error, Result},
};

use aws_sdk_dynamodb::{primitives::Blob, types};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::{collections, fmt};

/// Canonical, lossless mirror of an attribute value used for token serialization.
#[derive(Debug, Deserialize, Serialize)]
enum TokenValue {
    B(String),
    Bool(bool),
    Bs(Vec<String>),
    L(Vec<TokenValue>),
    M(collections::BTreeMap<String, TokenValue>),
    N(String),
    Ns(Vec<String>),
    Null(bool),
    S(String),
    Ss(Vec<String>),
}

impl TryFrom<&types::AttributeValue> for TokenValue {
    type Error = Error;

    fn try_from(value: &types::AttributeValue) -> Result<Self> {
        let value = match value {
            types::AttributeValue::B(blob) => Self::B(URL_SAFE_NO_PAD.encode(blob.as_ref())),
            types::AttributeValue::Bool(value) => Self::Bool(*value),
            types::AttributeValue::Bs(blobs) => Self::Bs(
                blobs
                    .iter()
                    .map(|blob| URL_SAFE_NO_PAD.encode(blob.as_ref()))
                    .collect(),
            ),
            types::AttributeValue::L(values) => {
                Self::L(values.iter().map(Self::try_from).collect::<Result<_>>()?)
            }
            types::AttributeValue::M(map) => Self::M(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), Self::try_from(value)?)))
                    .collect::<Result<_>>()?,
            ),
            types::AttributeValue::N(value) => Self::N(value.clone()),
            types::AttributeValue::Ns(values) => Self::Ns(values.clone()),
            types::AttributeValue::Null(value) => Self::Null(*value),
            types::AttributeValue::S(value) => Self::S(value.clone()),
            types::AttributeValue::Ss(values) => Self::Ss(values.clone()),
            _ => {
                return Err(Error::InvalidArgument(
                    "unknown attribute value variant in key".to_string(),
                ));
            }
        };
        Ok(value)
    }
}

fn decode_blob(value: &str) -> Result<Blob> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map(Blob::new)
        .map_err(|err| Error::InvalidArgument(format!("invalid page token: {err}")))
}

impl TryFrom<TokenValue> for types::AttributeValue {
    type Error = Error;

    fn try_from(value: TokenValue) -> Result<Self> {
        let value = match value {
            TokenValue::B(blob) => Self::B(decode_blob(&blob)?),
            TokenValue::Bool(value) => Self::Bool(value),
            TokenValue::Bs(blobs) => Self::Bs(
                blobs
                    .iter()
                    .map(|blob| decode_blob(blob))
                    .collect::<Result<_>>()?,
            ),
            TokenValue::L(values) => Self::L(
                values
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_>>()?,
            ),
            TokenValue::M(map) => Self::M(
                map.into_iter()
                    .map(|(key, value)| Ok((key, Self::try_from(value)?)))
                    .collect::<Result<_>>()?,
            ),
            TokenValue::N(value) => Self::N(value),
            TokenValue::Ns(values) => Self::Ns(values),
            TokenValue::Null(value) => Self::Null(value),
            TokenValue::S(value) => Self::S(value),
            TokenValue::Ss(values) => Self::Ss(values),
        };
        Ok(value)
    }
}

/// Opaque cursor over a scan or query, encoding the store's last evaluated key.
///
/// Tokens are url-safe base64 of a canonical JSON form of the key, so they survive being
/// handed to another process. Their contents are not part of the API.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PageToken(String);

impl PageToken {
    /// Encodes a key value.
    pub fn encode(key: &Item) -> Result<Self> {
        let canonical = canonical_key(key)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(canonical)))
    }

    /// Decodes back into the key value it was produced from.
    pub fn decode(&self) -> Result<Item> {
        let json = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|err| Error::InvalidArgument(format!("invalid page token: {err}")))?;
        let map: collections::BTreeMap<String, TokenValue> = serde_json::from_slice(&json)?;
        map.into_iter()
            .map(|(key, value)| Ok((key, value.try_into()?)))
            .collect()
    }

    /// Wraps a token string previously obtained from [`PageToken::as_str`].
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical serialization of a key: sorted attribute names, tagged values.
pub(crate) fn canonical_key(key: &Item) -> Result<String> {
    let map = key
        .iter()
        .map(|(name, value)| Ok((name.clone(), TokenValue::try_from(value)?)))
        .collect::<Result<collections::BTreeMap<_, _>>>()?;
    Ok(serde_json::to_string(&map)?)
}
