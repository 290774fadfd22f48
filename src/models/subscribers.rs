use serde::{Deserialize, Serialize};

/// On-disk layout of the subscriber file: `{ "activeJids": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberFile {
    #[serde(rename = "activeJids", default)]
    pub active_jids: Vec<String>,
}

impl SubscriberFile {
    /// Drop repeated and blank entries, keeping the first occurrence of each.
    pub fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.active_jids
            .retain(|jid| !jid.trim().is_empty() && seen.insert(jid.clone()));
    }
}
