//! The memory log: conversational history accumulated across steps.
//!
//! Append-only between explicit clears. Entries are replayed verbatim, in
//! insertion order, into any step that opts into memory.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// One remembered `{role, content}` pair.
pub type MemoryEntry = Message;

/// Ordered history of executed prompts and their responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryLog {
    entries: Vec<MemoryEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single entry.
    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
    }

    /// Record one executed step: the prompt as sent, then the generated reply.
    ///
    /// The reply is always stored as `assistant`, whatever the prompt's role.
    pub fn record_exchange(
        &mut self,
        prompt_role: Role,
        prompt_content: impl Into<String>,
        response: impl Into<String>,
    ) {
        self.entries.push(Message::new(prompt_role, prompt_content));
        self.entries.push(Message::assistant(response));
    }

    /// Read-only view of all entries in insertion order.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MemoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_entries(self) -> Vec<MemoryEntry> {
        self.entries
    }
}

impl From<Vec<MemoryEntry>> for MemoryLog {
    fn from(entries: Vec<MemoryEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a MemoryLog {
    type Item = &'a MemoryEntry;
    type IntoIter = std::slice::Iter<'a, MemoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_appends_prompt_then_reply() {
        let mut log = MemoryLog::new();
        log.record_exchange(Role::System, "Be terse.", "Understood.");

        assert_eq!(
            log.entries(),
            &[
                Message::system("Be terse."),
                Message::assistant("Understood."),
            ]
        );
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = MemoryLog::new();
        log.record_exchange(Role::User, "one", "1");
        log.record_exchange(Role::User, "two", "2");

        let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "1", "two", "2"]);
    }

    #[test]
    fn clear_empties_log() {
        let mut log = MemoryLog::from(vec![Message::user("x")]);
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn serializes_as_plain_list() {
        let log = MemoryLog::from(vec![Message::user("hi")]);
        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(json, r#"[{"role":"user","content":"hi"}]"#);
    }
}
