use std::time::Duration;

use moka::sync::Cache;
use uuid::Uuid;

/// Process-wide set of revoked token identifiers (`jti` claims).
///
/// Entries expire after the refresh TTL, at which point no token carrying
/// the identifier can still validate anyway.
#[derive(Clone)]
pub struct RevokedTokens {
    cache: Cache<Uuid, ()>,
}

impl RevokedTokens {
    pub fn new(ttl_minutes: i64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_minutes.max(1) as u64 * 60))
            .build();
        Self { cache }
    }

    pub fn revoke(&self, jti: Uuid) {
        self.cache.insert(jti, ());
    }

    pub fn is_revoked(&self, jti: &Uuid) -> bool {
        self.cache.contains_key(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_id_is_found() {
        let revoked = RevokedTokens::new(60);
        let jti = Uuid::new_v4();
        assert!(!revoked.is_revoked(&jti));
        revoked.revoke(jti);
        assert!(revoked.is_revoked(&jti));
    }

    #[test]
    fn other_ids_are_unaffected() {
        let revoked = RevokedTokens::new(60);
        revoked.revoke(Uuid::new_v4());
        assert!(!revoked.is_revoked(&Uuid::new_v4()));
    }
}
