//! Conversation Context Builder
//!
//! Decides exactly which turns go to the provider for one completion.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ system directive          (always present)   │
//! ├──────────────────────────────────────────────┤
//! │ replayed history          (budgeted)         │
//! │  - user/assistant turns only                 │
//! │  - at most N turns, newest first             │
//! │  - at most C characters, newest first        │
//! ├──────────────────────────────────────────────┤
//! │ new user message          (always present)   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Budgets govern replayed history only. The directive and the new message are
//! included even when they are individually large.

use serde::Serialize;

use super::types::{Role, Turn};
use crate::config::ConfigError;

/// Default directive when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default maximum number of replayed history turns
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 30;

/// Default maximum number of replayed history characters
pub const DEFAULT_MAX_HISTORY_CHARS: usize = 30_000;

/// Immutable context settings, loaded once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub system_prompt: String,
    pub max_history_turns: usize,
    pub max_history_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
            max_history_chars: DEFAULT_MAX_HISTORY_CHARS,
        }
    }
}

impl ContextConfig {
    /// Reject configurations the builder cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::EmptySystemPrompt);
        }
        if self.max_history_turns == 0 {
            return Err(ConfigError::NonPositiveBudget("max_history_turns"));
        }
        if self.max_history_chars == 0 {
            return Err(ConfigError::NonPositiveBudget("max_history_chars"));
        }
        Ok(())
    }
}

/// Ordered turns for one provider request.
///
/// Always `[system, ...replayed, user]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn system_turn(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn user_turn(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }

    /// The history portion between the directive and the new message
    pub fn replayed(&self) -> &[Turn] {
        &self.turns[1..self.turns.len() - 1]
    }

    /// Characters in the replayed history
    pub fn replayed_chars(&self) -> usize {
        self.replayed().iter().map(Turn::char_len).sum()
    }
}

/// Assemble the context for answering `new_user_message`.
///
/// `history` is the session's stored turns in chronological order; it is only
/// read. Validation of `new_user_message` is the caller's job.
pub fn build(history: &[Turn], new_user_message: &str, config: &ContextConfig) -> ConversationContext {
    let replayable: Vec<&Turn> = history.iter().filter(|t| t.role.is_replayable()).collect();

    let start = replayable.len().saturating_sub(config.max_history_turns);
    let window = &replayable[start..];

    let mut used_chars = 0usize;
    let mut tail: Vec<Turn> = Vec::with_capacity(window.len());
    for turn in window.iter().rev() {
        let len = turn.char_len();
        if used_chars + len > config.max_history_chars {
            break;
        }
        used_chars += len;
        tail.push((*turn).clone());
    }
    tail.reverse();

    let mut turns = Vec::with_capacity(tail.len() + 2);
    turns.push(Turn::system(config.system_prompt.clone()));
    turns.extend(tail);
    turns.push(Turn::new(Role::User, new_user_message));

    ConversationContext { turns }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(turns: usize, chars: usize) -> ContextConfig {
        ContextConfig {
            system_prompt: "be kind".to_string(),
            max_history_turns: turns,
            max_history_chars: chars,
        }
    }

    fn alternating(count: usize, content: impl Fn(usize) -> String) -> Vec<Turn> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(content(i))
                } else {
                    Turn::assistant(content(i))
                }
            })
            .collect()
    }

    /// The replayed slice must be a contiguous suffix of the filtered history
    fn assert_suffix_of(replayed: &[Turn], history: &[Turn]) {
        let filtered: Vec<&Turn> = history.iter().filter(|t| t.role.is_replayable()).collect();
        assert!(replayed.len() <= filtered.len());
        let offset = filtered.len() - replayed.len();
        for (i, turn) in replayed.iter().enumerate() {
            assert_eq!(turn, filtered[offset + i]);
        }
    }

    #[test]
    fn test_empty_history() {
        let ctx = build(&[], "hi", &ContextConfig::default());
        assert_eq!(
            ctx.turns(),
            &[Turn::system(DEFAULT_SYSTEM_PROMPT), Turn::user("hi")]
        );
        assert!(ctx.replayed().is_empty());
    }

    #[test]
    fn test_turn_budget_keeps_most_recent() {
        let history = alternating(40, |i| char::from(b'a' + (i % 26) as u8).to_string());
        let ctx = build(&history, "next", &config(30, 30_000));

        assert_eq!(ctx.replayed().len(), 30);
        assert_eq!(ctx.replayed(), &history[10..]);
        assert_suffix_of(ctx.replayed(), &history);
    }

    #[test]
    fn test_char_budget_drops_oldest() {
        let history = alternating(5, |i| std::iter::repeat_n(char::from(b'a' + i as u8), 10_000).collect());
        let ctx = build(&history, "next", &config(30, 30_000));

        assert_eq!(ctx.replayed().len(), 3);
        assert_eq!(ctx.replayed(), &history[2..]);
        assert!(ctx.replayed_chars() <= 30_000);
    }

    #[test]
    fn test_char_budget_stops_at_first_overflow() {
        // Newest fits, the one before it does not; older small turns are not
        // pulled in past the gap
        let history = vec![
            Turn::user("a"),
            Turn::assistant("b".repeat(50)),
            Turn::user("c".repeat(10)),
        ];
        let ctx = build(&history, "next", &config(30, 20));
        assert_eq!(ctx.replayed(), &history[2..]);
    }

    #[test]
    fn test_non_replayable_roles_are_dropped() {
        let history = vec![
            Turn::system("(session init)"),
            Turn::user("hello"),
            Turn::system("(session init)"),
            Turn::assistant("hi there"),
        ];
        let ctx = build(&history, "how are you?", &config(30, 30_000));

        assert_eq!(ctx.replayed(), &[Turn::user("hello"), Turn::assistant("hi there")]);
        assert_eq!(ctx.turns().iter().filter(|t| t.role == Role::System).count(), 1);
    }

    #[test]
    fn test_system_turns_do_not_consume_turn_budget() {
        let mut history = Vec::new();
        for i in 0..10 {
            history.push(Turn::system("meta"));
            history.push(Turn::user(format!("u{}", i)));
        }
        let ctx = build(&history, "x", &config(5, 30_000));
        assert_eq!(ctx.replayed().len(), 5);
        assert_eq!(ctx.replayed()[0], Turn::user("u5"));
    }

    #[test]
    fn test_large_new_message_always_included() {
        let huge = "z".repeat(100_000);
        let history = alternating(4, |_| "short".to_string());
        let ctx = build(&history, &huge, &config(30, 10));

        assert_eq!(ctx.user_turn(), &Turn::user(huge.clone()));
        assert_eq!(ctx.replayed().len(), 2);
        assert_eq!(ctx.system_turn().role, Role::System);
    }

    #[test]
    fn test_single_oversized_history_turn_replays_nothing() {
        let history = vec![Turn::user("y".repeat(500))];
        let ctx = build(&history, "hi", &config(30, 100));
        assert!(ctx.replayed().is_empty());
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_budgets_hold_across_shapes() {
        for count in [0usize, 1, 7, 31, 64] {
            for (turns, chars) in [(1usize, 1usize), (3, 25), (30, 30_000), (100, 60)] {
                let history = alternating(count, |i| "m".repeat(i % 13 + 1));
                let ctx = build(&history, "new", &config(turns, chars));

                assert!(ctx.replayed().len() <= turns);
                assert!(ctx.replayed_chars() <= chars);
                assert_suffix_of(ctx.replayed(), &history);
                assert_eq!(ctx.system_turn(), &Turn::system("be kind"));
                assert_eq!(ctx.user_turn(), &Turn::user("new"));
                assert!(!ctx.is_empty());
            }
        }
    }

    #[test]
    fn test_history_is_not_mutated() {
        let history = alternating(3, |i| format!("m{}", i));
        let before = history.clone();
        let _ = build(&history, "again", &config(1, 1));
        assert_eq!(history, before);
    }

    #[test]
    fn test_context_serializes_as_message_array() {
        let ctx = build(&[Turn::user("a")], "b", &config(30, 100));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "system", "content": "be kind"},
                {"role": "user", "content": "a"},
                {"role": "user", "content": "b"},
            ])
        );
    }

    #[test]
    fn test_validate_rejects_bad_budgets() {
        assert!(ContextConfig::default().validate().is_ok());
        assert!(matches!(
            config(0, 10).validate(),
            Err(ConfigError::NonPositiveBudget("max_history_turns"))
        ));
        assert!(matches!(
            config(10, 0).validate(),
            Err(ConfigError::NonPositiveBudget("max_history_chars"))
        ));
        let blank = ContextConfig {
            system_prompt: "   ".into(),
            ..ContextConfig::default()
        };
        assert!(matches!(blank.validate(), Err(ConfigError::EmptySystemPrompt)));
    }
}
