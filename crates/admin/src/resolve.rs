//! Key resolution: business key to target id, memoized for one run.
//!
//! The [`IdentifierMap`] is owned by a [`KeyResolver`] that lives in the
//! run context. It only grows: hits, misses and ids created during the run
//! are all remembered, and nothing is invalidated before the run ends.

use std::collections::HashMap;
use std::future::Future;

use storebridge_core::Gid;
use storebridge_core::discount::ReferenceKind;
use tracing::{debug, warn};

/// What a key refers to. Each kind has its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// Company location, keyed by source location id within a target company.
    Location,
    /// Company contact role, keyed by role name within a target company.
    Role,
    /// Product, keyed by handle.
    Product,
    /// Collection, keyed by handle.
    Collection,
    /// Customer segment, keyed by name.
    Segment,
    /// Customer, keyed by email.
    Customer,
    /// Product variant, keyed by SKU.
    Variant,
}

impl LookupKind {
    /// Label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Role => "role",
            Self::Product => "product",
            Self::Collection => "collection",
            Self::Segment => "segment",
            Self::Customer => "customer",
            Self::Variant => "variant",
        }
    }

    /// Kinds that are only ever filled by the company flow, never looked up.
    #[must_use]
    pub const fn is_cache_only(self) -> bool {
        matches!(self, Self::Location | Self::Role)
    }

    /// Canonical form of a key. SKUs and location ids are case-sensitive.
    #[must_use]
    pub fn normalize(self, key: &str) -> String {
        let key = key.trim();
        match self {
            Self::Location | Self::Variant => key.to_owned(),
            Self::Role | Self::Product | Self::Collection | Self::Segment | Self::Customer => {
                key.to_lowercase()
            }
        }
    }
}

impl From<ReferenceKind> for LookupKind {
    fn from(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::Product => Self::Product,
            ReferenceKind::Collection => Self::Collection,
            ReferenceKind::Variant => Self::Variant,
            ReferenceKind::Customer => Self::Customer,
            ReferenceKind::Segment => Self::Segment,
        }
    }
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key for kinds scoped by a parent, e.g. locations of one company.
#[must_use]
pub fn scoped(scope: &str, key: &str) -> String {
    format!("{scope}::{key}")
}

/// Run-scoped cache of resolved ids. `None` records a memoized miss.
#[derive(Debug, Default)]
pub struct IdentifierMap {
    entries: HashMap<(LookupKind, String), Option<String>>,
}

impl IdentifierMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(hit_or_miss)` when the key has been seen, `None` otherwise.
    #[must_use]
    pub fn get(&self, kind: LookupKind, key: &str) -> Option<Option<&str>> {
        self.entries
            .get(&(kind, kind.normalize(key)))
            .map(Option::as_deref)
    }

    /// Record an id. Replaces a memoized miss.
    pub fn remember(&mut self, kind: LookupKind, key: &str, id: impl Into<String>) {
        self.entries
            .insert((kind, kind.normalize(key)), Some(id.into()));
    }

    fn remember_miss(&mut self, kind: LookupKind, key: &str) {
        self.entries.insert((kind, kind.normalize(key)), None);
    }

    /// Number of memoized keys, hits and misses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been memoized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Target-side lookup by natural key.
///
/// Implementations return the ids of exact matches only. The resolver
/// decides what zero or several ids mean.
pub trait Lookup {
    /// Lookup failure. Always propagated.
    type Error;

    /// Ids of the records whose natural key for `kind` equals `key`.
    fn lookup(
        &self,
        kind: LookupKind,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;
}

/// Outcome of resolving a list of references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    /// Resolved ids, in input order.
    pub ids: Vec<String>,
    /// References that did not resolve.
    pub missing: Vec<String>,
}

/// Resolves business keys to target ids, memoizing every answer.
#[derive(Debug)]
pub struct KeyResolver<L> {
    lookup: L,
    map: IdentifierMap,
}

impl<L: Lookup + Sync> KeyResolver<L> {
    /// A resolver with an empty map.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            map: IdentifierMap::new(),
        }
    }

    /// The lookup backend.
    pub const fn lookup(&self) -> &L {
        &self.lookup
    }

    /// The run's map.
    pub const fn map(&self) -> &IdentifierMap {
        &self.map
    }

    /// Record an id created or matched during the run.
    pub fn remember(&mut self, kind: LookupKind, key: &str, id: impl Into<String>) {
        self.map.remember(kind, key, id);
    }

    /// Resolve one reference.
    ///
    /// A reference that already is a target id comes back unchanged. Zero
    /// or several exact matches resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error; failures are not memoized.
    pub async fn resolve(
        &mut self,
        kind: LookupKind,
        reference: &str,
    ) -> Result<Option<String>, L::Error> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }
        if kind.is_cache_only() {
            return Ok(self.map.get(kind, reference).flatten().map(str::to_owned));
        }
        if Gid::looks_like_gid(reference) {
            return Ok(Some(reference.to_owned()));
        }
        if let Some(cached) = self.map.get(kind, reference) {
            debug!(kind = %kind, key = reference, hit = cached.is_some(), "identifier cache hit");
            return Ok(cached.map(str::to_owned));
        }

        let mut ids = self.lookup.lookup(kind, reference).await?;
        let resolved = match ids.len() {
            0 => None,
            1 => ids.pop(),
            n => {
                warn!(
                    kind = %kind,
                    key = reference,
                    matches = n,
                    "ambiguous reference, not resolving"
                );
                None
            }
        };

        match &resolved {
            Some(id) => self.map.remember(kind, reference, id.clone()),
            None => self.map.remember_miss(kind, reference),
        }
        Ok(resolved)
    }

    /// Resolve a list of references, logging and excluding misses.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error.
    pub async fn resolve_all<S: AsRef<str> + Sync>(
        &mut self,
        kind: LookupKind,
        references: &[S],
    ) -> Result<Resolved, L::Error> {
        let mut resolved = Resolved::default();
        for reference in references {
            let reference = reference.as_ref();
            match self.resolve(kind, reference).await? {
                Some(id) => resolved.ids.push(id),
                None => {
                    warn!(kind = %kind, key = reference, "reference did not resolve, excluding");
                    resolved.missing.push(reference.to_owned());
                }
            }
        }
        Ok(resolved)
    }
}
