//! Entity matching: find the target record an entity already corresponds to.
//!
//! Business keys are tried in trust order (external id before name, email
//! before phone). The first key that yields exactly one candidate wins. A key
//! with several candidates is ambiguous and never picks one implicitly; the
//! matcher records it and falls through to the next key.

use std::convert::Infallible;
use std::future::Future;

use crate::types::Email;

/// A business key used to look for an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    /// Authoritative id copied from the source system.
    ExternalId(String),
    /// URL handle.
    Handle(String),
    /// Normalized email.
    Email(Email),
    /// Phone number as written.
    Phone(String),
    /// Display name.
    Name(String),
    /// Discount code.
    Code(String),
    /// Title (automatic discounts).
    Title(String),
}

impl MatchKey {
    /// Strategy label for logs.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::ExternalId(_) => "external_id",
            Self::Handle(_) => "handle",
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
            Self::Name(_) => "name",
            Self::Code(_) => "code",
            Self::Title(_) => "title",
        }
    }

    /// The key's value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Email(email) => email.as_str(),
            Self::ExternalId(v)
            | Self::Handle(v)
            | Self::Phone(v)
            | Self::Name(v)
            | Self::Code(v)
            | Self::Title(v) => v,
        }
    }

    /// Blank keys are never queried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value().trim().is_empty()
    }

    /// Build a key from an optional value, dropping blanks.
    pub fn from_optional(value: Option<&str>, make: fn(String) -> Self) -> Option<Self> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| make(v.to_owned()))
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Something that can list target records matching one key.
///
/// Implementations should already filter to exact matches; the matcher only
/// counts what comes back.
pub trait CandidateSource<T> {
    /// Lookup failure. Propagated unchanged by [`find_existing`].
    type Error;

    /// Target records matching `key`.
    fn candidates(
        &self,
        key: &MatchKey,
    ) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send;
}

/// Outcome of [`find_existing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport<T> {
    /// The winning key and the record it selected.
    pub found: Option<(MatchKey, T)>,
    /// Keys that returned more than one candidate, with the candidate count.
    pub ambiguous: Vec<(MatchKey, usize)>,
}

impl<T> MatchReport<T> {
    /// The matched record, dropping the key.
    pub fn into_found(self) -> Option<T> {
        self.found.map(|(_, record)| record)
    }
}

/// Try `keys` in order; the first key with exactly one candidate wins.
///
/// # Errors
///
/// Returns the first lookup error. Keys after a failing lookup are not tried.
pub async fn find_existing<T, S>(source: &S, keys: &[MatchKey]) -> Result<MatchReport<T>, S::Error>
where
    S: CandidateSource<T> + Sync,
    T: Send,
{
    let mut ambiguous = Vec::new();

    for key in keys.iter().filter(|k| !k.is_empty()) {
        let mut candidates = source.candidates(key).await?;
        match candidates.len() {
            0 => {}
            1 => {
                let record = candidates.swap_remove(0);
                return Ok(MatchReport {
                    found: Some((key.clone(), record)),
                    ambiguous,
                });
            }
            n => ambiguous.push((key.clone(), n)),
        }
    }

    Ok(MatchReport {
        found: None,
        ambiguous,
    })
}

/// A candidate source over records that were already fetched.
///
/// Used for children listed together with their parent (a company's
/// locations), where another round-trip per key would be wasted.
pub struct Listed<'a, T, F> {
    records: &'a [T],
    matches: F,
}

impl<'a, T, F> Listed<'a, T, F>
where
    F: Fn(&T, &MatchKey) -> bool,
{
    /// Wrap `records`; `matches` decides whether a record matches a key.
    pub const fn new(records: &'a [T], matches: F) -> Self {
        Self { records, matches }
    }
}

impl<T, F> CandidateSource<T> for Listed<'_, T, F>
where
    T: Clone + Send + Sync,
    F: Fn(&T, &MatchKey) -> bool + Sync,
{
    type Error = Infallible;

    fn candidates(
        &self,
        key: &MatchKey,
    ) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send {
        let found = self
            .records
            .iter()
            .filter(|r| (self.matches)(r, key))
            .cloned()
            .collect();
        std::future::ready(Ok(found))
    }
}
