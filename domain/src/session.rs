use serde::{Deserialize, Serialize};
use shared::utils::title_case;

const FOLLOW_UP_PRONOUNS: [&str; 4] = ["it", "its", "this", "that"];
const TOPIC_PREFIXES: [&str; 3] = ["what is ", "what are ", "who is "];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub last_topic: Option<String>,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// A question after follow-up resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuestion {
    pub text: String,
    pub follow_up_topic: Option<String>,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self {
            id,
            last_topic: None,
            history: Vec::new(),
        }
    }

    pub fn add_message(&mut self, role: &str, content: &str) {
        self.history.push(Message {
            role: role.to_string(),
            content: content.to_string(),
        });
    }

    /// Rewrite a follow-up question ("how do I reset it?") against the last
    /// known topic. Questions without a follow-up pronoun, or asked while no
    /// topic is known, pass through unchanged.
    pub fn resolve(&self, question: &str) -> ResolvedQuestion {
        let Some(topic) = self.last_topic.as_deref() else {
            return ResolvedQuestion {
                text: question.to_string(),
                follow_up_topic: None,
            };
        };

        let mut replaced = false;
        let rewritten = question
            .split(' ')
            .map(|word| {
                let trimmed = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
                let suffix = &word[trimmed.len()..];
                let lower = trimmed.to_lowercase();
                if FOLLOW_UP_PRONOUNS.contains(&lower.as_str()) {
                    replaced = true;
                    if lower == "its" {
                        format!("{topic}'s{suffix}")
                    } else {
                        format!("{topic}{suffix}")
                    }
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        if replaced {
            ResolvedQuestion {
                text: rewritten,
                follow_up_topic: Some(topic.to_string()),
            }
        } else {
            ResolvedQuestion {
                text: question.to_string(),
                follow_up_topic: None,
            }
        }
    }

    /// Update the tracked topic after a turn. A follow-up keeps the topic, a
    /// "what is X" question sets it, anything else clears it. An answer that
    /// found nothing always clears it.
    pub fn record_turn(&mut self, question: &str, resolved: &ResolvedQuestion, found_documents: bool) {
        if resolved.follow_up_topic.is_none() {
            self.last_topic = extract_topic(question);
        }
        if !found_documents {
            self.last_topic = None;
        }
    }
}

/// Extract the subject of "what is X?" style questions, title cased.
/// The prefix must start a word, and a bare pronoun is never a topic.
pub fn extract_topic(question: &str) -> Option<String> {
    let lower = question.trim().to_lowercase();
    TOPIC_PREFIXES.iter().find_map(|prefix| {
        let start = lower
            .match_indices(prefix)
            .map(|(idx, _)| idx)
            .find(|&idx| starts_word(&lower, idx))?
            + prefix.len();
        let rest = lower[start..].split('?').next().unwrap_or_default();
        let rest = rest
            .trim()
            .trim_start_matches("a ")
            .trim_start_matches("an ")
            .trim_start_matches("the ")
            .trim();
        if rest.is_empty() || FOLLOW_UP_PRONOUNS.contains(&rest) {
            None
        } else {
            Some(title_case(rest))
        }
    })
}

fn starts_word(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}
