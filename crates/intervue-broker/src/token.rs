use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{BrokerError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Scoped permissions carried inside a room credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomGrants {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

impl RoomGrants {
    /// Full participant grants for one room.
    pub fn participant(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    nbf: i64,
    exp: i64,
    video: RoomGrants,
}

/// A minted bearer credential. Immutable after mint; revocation relies
/// solely on the TTL.
#[derive(Debug, Clone)]
pub struct RoomToken {
    pub token: String,
    pub room_name: String,
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints JWT-shaped room credentials signed with the broker API secret.
///
/// The rest of the core treats minted tokens as opaque — nothing outside
/// this module parses their interior.
pub struct TokenMinter {
    api_key: String,
    api_secret: String,
}

impl TokenMinter {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Mint a credential for `identity` with the given grants and TTL.
    pub fn mint(&self, identity: &str, ttl: Duration, grants: RoomGrants) -> Result<RoomToken> {
        if identity.is_empty() {
            return Err(BrokerError::Token("participant identity is empty".into()));
        }
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            video: grants.clone(),
        };

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).map_err(|e| BrokerError::Token(e.to_string()))?,
        );
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);

        Ok(RoomToken {
            token: format!("{signing_input}.{signature}"),
            room_name: grants.room,
            identity: identity.to_string(),
            expires_at,
        })
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|_| BrokerError::Token("invalid signing key length".into()))?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Decode and verify a token minted by this key pair. Only used by the
    /// test suite; the core never inspects credentials in production paths.
    #[cfg(test)]
    fn decode(&self, token: &str) -> Result<Claims> {
        let mut parts = token.split('.');
        let (header, payload, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s)) if parts.next().is_none() => (h, p, s),
            _ => return Err(BrokerError::Token("malformed token".into())),
        };

        let expected = self.sign(format!("{header}.{payload}").as_bytes())?;
        let got = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| BrokerError::Token("signature is not base64url".into()))?;
        if expected != got {
            return Err(BrokerError::Token("signature mismatch".into()));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| BrokerError::Token("payload is not base64url".into()))?;
        serde_json::from_slice(&raw).map_err(|e| BrokerError::Token(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minter() -> TokenMinter {
        TokenMinter::new("api-key-1", "super-secret-value")
    }

    #[test]
    fn minted_token_carries_grants_and_identity() {
        let token = minter()
            .mint(
                "candidate-7",
                Duration::hours(2),
                RoomGrants::participant("interview-abc"),
            )
            .expect("mint");

        assert_eq!(token.room_name, "interview-abc");
        let claims = minter().decode(&token.token).expect("decode");
        assert_eq!(claims.sub, "candidate-7");
        assert_eq!(claims.iss, "api-key-1");
        assert!(claims.video.room_join);
        assert!(claims.video.can_publish);
        assert_eq!(claims.video.room, "interview-abc");
        assert_eq!(claims.exp - claims.nbf, 2 * 60 * 60);
    }

    #[test]
    fn tampered_token_fails_verification() {
        let token = minter()
            .mint(
                "candidate-7",
                Duration::hours(2),
                RoomGrants::participant("interview-abc"),
            )
            .expect("mint");

        let mut tampered = token.token.clone();
        tampered.truncate(tampered.len() - 2);
        assert!(minter().decode(&tampered).is_err());

        let other = TokenMinter::new("api-key-1", "different-secret");
        assert!(other.decode(&token.token).is_err());
    }

    #[test]
    fn empty_identity_is_rejected() {
        let err = minter()
            .mint("", Duration::hours(2), RoomGrants::participant("interview-x"))
            .unwrap_err();
        assert!(matches!(err, BrokerError::Token(_)));
    }

    #[test]
    fn token_is_three_base64url_segments() {
        let token = minter()
            .mint(
                "a",
                Duration::minutes(5),
                RoomGrants::participant("interview-x"),
            )
            .expect("mint");
        assert_eq!(token.token.split('.').count(), 3);
        assert!(!token.token.contains('='));
    }
}
