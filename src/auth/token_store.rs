//! Credential holder with durable and session-only persistence scopes
//!
//! The store keeps an in-memory copy of the current [`TokenPair`] and
//! mirrors it into exactly one backing scope, chosen at login by the
//! "remember me" flag. The other scope is cleared on every write so there
//! is never any doubt about which copy is authoritative.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use tracing::{debug, info, warn};

use super::models::{Claims, TokenPair};
use crate::common::error::TokenError;
use crate::common::helpers::safe_token_log;

/// Tokens within this many seconds of expiry count as expired
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 15;

/// A persistence scope for the token pair
pub trait TokenScope: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self) -> Result<TokenPair, TokenError>;
    fn save(&self, pair: &TokenPair) -> Result<(), TokenError>;
    fn clear(&self) -> Result<(), TokenError>;
}

/// Session-only scope: lives as long as the process
#[derive(Default)]
pub struct MemoryScope {
    pair: RwLock<TokenPair>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenScope for MemoryScope {
    fn name(&self) -> &'static str {
        "session"
    }

    fn load(&self) -> Result<TokenPair, TokenError> {
        Ok(read_lock(&self.pair).clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<(), TokenError> {
        *write_lock(&self.pair) = pair.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        *write_lock(&self.pair) = TokenPair::empty();
        Ok(())
    }
}

/// Durable scope: a JSON file that survives restarts
pub struct FileScope {
    path: PathBuf,
}

impl FileScope {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("tokens.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenScope for FileScope {
    fn name(&self) -> &'static str {
        "durable"
    }

    fn load(&self) -> Result<TokenPair, TokenError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TokenPair::empty()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, pair: &TokenPair) -> Result<(), TokenError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string(pair)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single source of truth for the current credentials
pub struct TokenStore {
    cache: RwLock<TokenPair>,
    remembered: RwLock<Option<bool>>,
    durable: Option<Arc<dyn TokenScope>>,
    session: Option<Arc<dyn TokenScope>>,
}

impl TokenStore {
    pub fn new(durable: Option<Arc<dyn TokenScope>>, session: Option<Arc<dyn TokenScope>>) -> Self {
        Self {
            cache: RwLock::new(TokenPair::empty()),
            remembered: RwLock::new(None),
            durable,
            session,
        }
    }

    /// Store backed by a token file under `dir` and a process-memory session scope
    pub fn with_file(dir: impl AsRef<Path>) -> Self {
        Self::new(
            Some(Arc::new(FileScope::new(dir))),
            Some(Arc::new(MemoryScope::new())),
        )
    }

    /// Store with no persistence at all. Reads fall back to `None`.
    pub fn in_memory() -> Self {
        Self::new(None, None)
    }

    /// Persists `pair` into the scope picked by `remember` and clears the
    /// other one. Memory is only updated once both writes succeeded.
    pub fn set_tokens(&self, pair: TokenPair, remember: bool) -> Result<(), TokenError> {
        let (chosen, other) = if remember {
            (&self.durable, &self.session)
        } else {
            (&self.session, &self.durable)
        };

        if let Some(scope) = other {
            scope.clear()?;
        }
        if let Some(scope) = chosen {
            scope.save(&pair)?;
            debug!(scope = scope.name(), "Tokens persisted");
        }

        *write_lock(&self.cache) = pair.clone();
        *write_lock(&self.remembered) = Some(remember);

        info!(
            remember,
            access = %pair.access.as_deref().map(safe_token_log).unwrap_or_default(),
            "Session tokens stored"
        );
        Ok(())
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.lookup(|pair| pair.access)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.lookup(|pair| pair.refresh)
    }

    /// A refresh token is what makes a session logged in
    pub fn is_logged_in(&self) -> bool {
        self.get_refresh_token().is_some()
    }

    /// Replaces the access token after a refresh made with `refresh_used`.
    ///
    /// The write is discarded when the session changed while the refresh was
    /// in flight (logout, re-login), so a late refresh cannot resurrect
    /// cleared credentials. Returns whether the write happened.
    ///
    /// The refreshed token is usable as soon as it is in memory, so a failed
    /// save is logged and does not undo the refresh.
    pub fn replace_access_if_current(
        &self,
        refresh_used: &str,
        access: &str,
        rotated_refresh: Option<&str>,
    ) -> bool {
        let mut cache = write_lock(&self.cache);
        let current = cache
            .refresh
            .clone()
            .or_else(|| self.lookup_scopes(|pair| pair.refresh));

        if current.as_deref() != Some(refresh_used) {
            warn!("Session changed during token refresh; discarding refreshed token");
            return false;
        }

        let pair = TokenPair {
            access: Some(access.to_string()),
            refresh: Some(rotated_refresh.unwrap_or(refresh_used).to_string()),
        };
        *cache = pair.clone();
        drop(cache);

        if let Some(scope) = self.active_scope() {
            if let Err(e) = scope.save(&pair) {
                warn!(scope = scope.name(), error = %e, "Failed to persist refreshed token");
            }
        }
        debug!(
            access = %safe_token_log(access),
            rotated = rotated_refresh.is_some(),
            "Access token replaced"
        );
        true
    }

    /// Clears the session only if it is still the one holding `refresh_used`
    pub fn clear_if_current(&self, refresh_used: &str) {
        if self.get_refresh_token().as_deref() == Some(refresh_used) {
            self.clear_tokens();
        } else {
            debug!("Session changed since refresh started; keeping tokens");
        }
    }

    /// Wipes memory and both scopes unconditionally
    pub fn clear_tokens(&self) {
        *write_lock(&self.cache) = TokenPair::empty();
        *write_lock(&self.remembered) = None;

        for scope in [&self.durable, &self.session].into_iter().flatten() {
            if let Err(e) = scope.clear() {
                warn!(scope = scope.name(), error = %e, "Failed to clear token scope");
            }
        }
        info!("Session tokens cleared");
    }

    fn lookup(&self, pick: impl Fn(TokenPair) -> Option<String>) -> Option<String> {
        if let Some(value) = pick(read_lock(&self.cache).clone()) {
            return Some(value);
        }
        self.lookup_scopes(pick)
    }

    // Durable scope first, then session
    fn lookup_scopes(&self, pick: impl Fn(TokenPair) -> Option<String>) -> Option<String> {
        [&self.durable, &self.session]
            .into_iter()
            .flatten()
            .find_map(|scope| match scope.load() {
                Ok(pair) => pick(pair),
                Err(e) => {
                    warn!(scope = scope.name(), error = %e, "Failed to read token scope");
                    None
                }
            })
    }

    // The scope holding the live session, inferred from storage after a restart
    fn active_scope(&self) -> Option<&Arc<dyn TokenScope>> {
        let remembered = *read_lock(&self.remembered);
        let remember = remembered.unwrap_or_else(|| {
            self.durable
                .as_ref()
                .and_then(|scope| scope.load().ok())
                .map(|pair| pair.refresh.is_some())
                .unwrap_or(false)
        });
        if remember {
            self.durable.as_ref()
        } else {
            self.session.as_ref()
        }
    }
}

/// Whether `token` expires within `skew_secs` of `now` (epoch seconds).
///
/// Decodes the embedded `exp` claim without verifying the signature. A token
/// with no decodable expiry is treated as not expired.
pub fn is_expired_at(token: &str, skew_secs: i64, now: i64) -> bool {
    match decode_expiry(token) {
        Some(exp) => now + skew_secs >= exp,
        None => false,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, DEFAULT_EXPIRY_SKEW_SECS, chrono::Utc::now().timestamp())
}

/// Reads the `exp` claim, if any
pub fn decode_expiry(token: &str) -> Option<i64> {
    let header = decode_header(token).ok()?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
