//! Thread grouping for the reading pane.

use serde::Serialize;

use crate::message::Message;

/// A run of consecutive messages from the same sender.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadGroup {
    /// Sender address shared by the run, lowercase.
    pub sender: String,
    /// Messages in their original order, oldest first.
    pub messages: Vec<Message>,
}

/// Split a message sequence into consecutive same-sender runs.
///
/// Order is preserved exactly; flattening the groups reproduces the
/// input. Sender addresses compare case-insensitively, so a reply
/// from `Alice@` continues a run started by `alice@`. An empty input
/// yields no groups.
#[must_use]
pub fn group_by_sender(messages: Vec<Message>) -> Vec<ThreadGroup> {
    let mut groups: Vec<ThreadGroup> = Vec::new();
    for message in messages {
        let sender = message.from_address.trim().to_lowercase();
        match groups.last_mut() {
            Some(group) if group.sender == sender => group.messages.push(message),
            _ => groups.push(ThreadGroup {
                sender,
                messages: vec![message],
            }),
        }
    }
    groups
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::message::{Direction, Folder, MessageId};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn msg(id: i64, from: &str) -> Message {
        Message {
            id: MessageId::new(id),
            account_id: AccountId::new(1),
            external_ref: format!("ref-{id}"),
            counterpart: "alice@example.com".to_string(),
            direction: Direction::Received,
            folder: Folder::Inbox,
            from_address: from.to_string(),
            to_addresses: vec!["me@example.com".to_string()],
            cc_addresses: Vec::new(),
            subject: String::new(),
            body_html: String::new(),
            body_text: String::new(),
            snippet: String::new(),
            is_read: false,
            is_flagged: false,
            attachments: Vec::new(),
            country: None,
            lead_status: None,
            sent_at: Utc.timestamp_opt(id, 0).single().unwrap(),
        }
    }

    fn senders(groups: &[ThreadGroup]) -> Vec<(&str, usize)> {
        groups
            .iter()
            .map(|g| (g.sender.as_str(), g.messages.len()))
            .collect()
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_sender(Vec::new()).is_empty());
    }

    #[test]
    fn single_sender_is_one_group() {
        let groups = group_by_sender(vec![msg(1, "alice@x.com"), msg(2, "alice@x.com")]);
        assert_eq!(senders(&groups), vec![("alice@x.com", 2)]);
    }

    #[test]
    fn alternating_senders_split_into_runs() {
        let groups = group_by_sender(vec![
            msg(1, "alice@x.com"),
            msg(2, "alice@x.com"),
            msg(3, "me@x.com"),
            msg(4, "alice@x.com"),
        ]);
        assert_eq!(
            senders(&groups),
            vec![("alice@x.com", 2), ("me@x.com", 1), ("alice@x.com", 1)]
        );
    }

    #[test]
    fn sender_case_does_not_break_a_run() {
        let groups = group_by_sender(vec![msg(1, "Alice@X.com"), msg(2, "alice@x.com ")]);
        assert_eq!(senders(&groups), vec![("alice@x.com", 2)]);
    }

    proptest! {
        #[test]
        fn flattened_groups_reproduce_the_input(picks in proptest::collection::vec(0u8..4, 0..40)) {
            let addresses = ["a@x.com", "b@x.com", "c@x.com", "d@x.com"];
            let messages: Vec<Message> = picks
                .iter()
                .enumerate()
                .map(|(i, &pick)| msg(i64::try_from(i).unwrap(), addresses[usize::from(pick)]))
                .collect();
            let original_ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();

            let groups = group_by_sender(messages);

            let flattened: Vec<MessageId> = groups
                .iter()
                .flat_map(|g| g.messages.iter().map(|m| m.id))
                .collect();
            prop_assert_eq!(flattened, original_ids);

            for group in &groups {
                prop_assert!(!group.messages.is_empty());
                for member in &group.messages {
                    prop_assert_eq!(member.from_address.to_lowercase(), group.sender.clone());
                }
            }
            for pair in groups.windows(2) {
                prop_assert_ne!(&pair[0].sender, &pair[1].sender);
            }
        }
    }
}
