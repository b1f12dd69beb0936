use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sender's observation of a single client's admissions during its
/// previous broadcast interval (§3, §6).
///
/// Field names match the wire schema verbatim: the authoritative shape is
/// the list-of-records form below, because the sender populates `ClientID`
/// explicitly per entry. The map-keyed-by-ClientId shape described in §9 as
/// a historical inconsistency in the source must never be emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEntry {
    #[serde(rename = "ClientID")]
    client_id: String,
    #[serde(rename = "LastRequest")]
    last_request: DateTime<Utc>,
    #[serde(rename = "Count")]
    count: u32,
}

impl AccessEntry {
    pub fn new(client_id: String, last_request: DateTime<Utc>, count: u32) -> Self {
        Self {
            client_id,
            last_request,
            count,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn last_request(&self) -> DateTime<Utc> {
        self.last_request
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Wire type sent between replicas (§3, §6). A set of `(ClientId, timestamp,
/// count)` tuples describing one sender's local admissions during its
/// previous interval; ordering is not significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerDigest {
    #[serde(rename = "UsersAccess")]
    users_access: Vec<AccessEntry>,
}

impl PeerDigest {
    pub fn from_entries(entries: Vec<AccessEntry>) -> Self {
        Self {
            users_access: entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users_access.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users_access.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AccessEntry> {
        self.users_access.iter()
    }
}
