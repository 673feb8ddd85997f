//! Character-budget truncation of a conversation.
//!
//! Each message costs the length of `"{author}: {content}\n"` in Unicode
//! scalar values. The kept messages are always a contiguous suffix of the
//! input: the walk from newest to oldest stops at the first message that
//! would overflow the budget, even if an older, shorter one would fit.

use chatdigest_core::message::ChatMessage;

/// Budgeted size of one message.
pub fn message_cost(message: &ChatMessage) -> usize {
    message.transcript_line().chars().count()
}

/// Budgeted size of a sequence of messages.
pub fn serialized_len(messages: &[ChatMessage]) -> usize {
    messages.iter().map(message_cost).sum()
}

/// The longest suffix of `messages` whose serialized length fits `max_chars`.
pub fn truncate(messages: &[ChatMessage], max_chars: usize) -> Vec<ChatMessage> {
    let mut used = 0;
    let mut start = messages.len();

    for (index, message) in messages.iter().enumerate().rev() {
        let cost = message_cost(message);
        if used + cost > max_chars {
            break;
        }
        used += cost;
        start = index;
    }

    messages[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, content: &str) -> ChatMessage {
        ChatMessage::new(author, content)
    }

    fn sample() -> Vec<ChatMessage> {
        vec![
            msg("alice", "did anyone look at the release checklist"),
            msg("bob", "yes"),
            msg("carol", "I think we should ship on Friday after the smoke tests pass"),
            msg("alice", "ok"),
            msg("bob", "agreed, Friday it is"),
        ]
    }

    #[test]
    fn everything_fits() {
        let messages = vec![msg("A", "hello"), msg("B", "hi")];
        assert_eq!(truncate(&messages, 1000), messages);
    }

    #[test]
    fn cost_counts_separator_and_newline() {
        // "A: hello\n" is 9 characters
        assert_eq!(message_cost(&msg("A", "hello")), 9);
        assert_eq!(serialized_len(&[msg("A", "hello"), msg("B", "hi")]), 15);
    }

    #[test]
    fn exact_budget_is_inclusive() {
        let messages = vec![msg("A", "hello"), msg("B", "hi")];
        assert_eq!(truncate(&messages, 15).len(), 2);
        assert_eq!(truncate(&messages, 14), vec![msg("B", "hi")]);
    }

    #[test]
    fn stops_at_first_overflow_without_skipping() {
        let messages = vec![msg("A", "x"), msg("B", &"y".repeat(50)), msg("C", "z")];
        // "C: z\n" = 5 fits, "B: yyy..\n" = 54 does not, "A: x\n" would fit but is not reachable
        let result = truncate(&messages, 20);
        assert_eq!(result, vec![msg("C", "z")]);
    }

    #[test]
    fn newest_message_too_long_gives_empty() {
        let messages = vec![msg("A", "short"), msg("B", &"long ".repeat(100))];
        assert!(truncate(&messages, 100).is_empty());
    }

    #[test]
    fn empty_input_and_zero_budget() {
        assert!(truncate(&[], 100).is_empty());
        assert!(truncate(&sample(), 0).is_empty());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // "é: ünïcödé\n" is 11 characters but more bytes
        let message = msg("é", "ünïcödé");
        assert_eq!(message_cost(&message), 11);
        assert_eq!(truncate(std::slice::from_ref(&message), 11).len(), 1);
    }

    #[test]
    fn result_is_fitting_suffix_for_every_budget() {
        let messages = sample();
        for budget in 0..=serialized_len(&messages) + 5 {
            let result = truncate(&messages, budget);
            assert!(serialized_len(&result) <= budget);
            assert_eq!(result.as_slice(), &messages[messages.len() - result.len()..]);

            // Maximal: adding the next older message would overflow
            if result.len() < messages.len() {
                let next = &messages[messages.len() - result.len() - 1];
                assert!(serialized_len(&result) + message_cost(next) > budget);
            }
        }
    }

    #[test]
    fn idempotent() {
        let messages = sample();
        for budget in [0, 10, 40, 80, 120, 10_000] {
            let once = truncate(&messages, budget);
            assert_eq!(truncate(&once, budget), once);
        }
    }
}
