//! Ordered, in-memory message store with id-addressed patching.

use crate::message::{Message, MessageId, Role};
use std::collections::HashMap;
use uuid::Uuid;

/// Ordered list of messages seeded with an assistant greeting.
///
/// Messages are only ever appended or truncated back to the greeting, so the
/// position recorded in `index` for an id stays valid until the next reset.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    greeting: String,
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
    next_id: u64,
}

impl Conversation {
    /// Create a conversation holding only `greeting`
    pub fn new(greeting: impl Into<String>) -> Self {
        let mut conversation = Self {
            id: Uuid::new_v4(),
            greeting: greeting.into(),
            messages: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
        };
        conversation.seed();
        conversation
    }

    fn seed(&mut self) {
        let greeting = self.greeting.clone();
        self.push(Role::Assistant, greeting);
    }

    /// Conversation id; a fresh one is assigned on every reset
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The seed greeting text
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// All messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a conversation holds at least its greeting
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Look up a message by id
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.index.get(&id).map(|&pos| &self.messages[pos])
    }

    /// Whether `id` belongs to the current conversation
    pub fn contains(&self, id: MessageId) -> bool {
        self.index.contains_key(&id)
    }

    /// Whether the user has said anything since the last reset
    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }

    /// Append a message and return its id
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, self.messages.len());
        self.messages.push(Message::new(id, role, content));
        id
    }

    /// Append `text` to the content of message `id`.
    ///
    /// Returns false, leaving everything untouched, when `id` is not part of
    /// this conversation (for example after a reset).
    pub fn append(&mut self, id: MessageId, text: &str) -> bool {
        let Some(&pos) = self.index.get(&id) else {
            return false;
        };
        self.messages[pos].content.push_str(text);
        true
    }

    /// Replace the content of message `id` with error text and mark it failed.
    /// Same absence rule as [`append`](Self::append).
    pub fn fail(&mut self, id: MessageId, text: impl Into<String>) -> bool {
        let Some(&pos) = self.index.get(&id) else {
            return false;
        };
        let message = &mut self.messages[pos];
        message.content = text.into();
        message.failed = true;
        true
    }

    /// Drop everything and start over from a fresh greeting.
    ///
    /// Ids keep counting up, so ids issued before the reset never resolve again.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.index.clear();
        self.id = Uuid::new_v4();
        self.seed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_seeded() {
        let conversation = Conversation::new("hello there");
        assert_eq!(conversation.len(), 1);
        let first = &conversation.messages()[0];
        assert_eq!(first.role, Role::Assistant);
        assert_eq!(first.content, "hello there");
        assert!(!conversation.has_user_messages());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut conversation = Conversation::new("hi");
        let a = conversation.push(Role::User, "a");
        let b = conversation.push(Role::Assistant, "");
        assert!(b > a);
        assert_eq!(conversation.get(a).unwrap().content, "a");
        assert!(conversation.get(b).unwrap().is_assistant());
    }

    #[test]
    fn test_append_concatenates_in_order() {
        let mut conversation = Conversation::new("hi");
        let id = conversation.push(Role::Assistant, "");
        assert!(conversation.append(id, "Hel"));
        assert!(conversation.append(id, "lo"));
        assert_eq!(conversation.get(id).unwrap().content, "Hello");
    }

    #[test]
    fn test_fail_replaces_partial_text() {
        let mut conversation = Conversation::new("hi");
        let id = conversation.push(Role::Assistant, "");
        conversation.append(id, "partial");
        assert!(!conversation.get(id).unwrap().failed);

        assert!(conversation.fail(id, "oops"));
        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "oops");
        assert!(message.failed);
    }

    #[test]
    fn test_reset_invalidates_old_ids() {
        let mut conversation = Conversation::new("hi");
        let old_id = conversation.id();
        let user = conversation.push(Role::User, "question");
        let reply = conversation.push(Role::Assistant, "");

        conversation.reset();

        assert_eq!(conversation.len(), 1);
        assert_ne!(conversation.id(), old_id);
        assert!(!conversation.contains(user));
        assert!(!conversation.append(reply, "late"));
        assert!(!conversation.fail(reply, "late"));
        assert_eq!(conversation.messages()[0].content, "hi");
    }

    #[test]
    fn test_ids_not_reused_after_reset() {
        let mut conversation = Conversation::new("hi");
        let before = conversation.push(Role::User, "x");
        conversation.reset();
        let after = conversation.push(Role::User, "y");
        assert!(after > before);
        assert!(!conversation.contains(before));
    }
}
