use crate::models::{ApiStatus, Intent, Mention};
use std::collections::BTreeSet;

/// Decides what a mention asks for. Pure: no side effects.
///
/// Self-analysis is checked before multi-target so a reply chain that tags
/// the bot several times is not mistaken for a request about several users.
pub fn classify(mention: &Mention, self_handle: &str) -> Intent {
    if mention.author == self_handle {
        return Intent::SelfMention;
    }

    let mut others: BTreeSet<&str> = mention
        .mentioned_handles
        .iter()
        .map(String::as_str)
        .collect();
    others.remove(self_handle);

    if mention.mentioned_handles.len() > 1 && others.is_empty() {
        return Intent::SelfAnalysisRequest;
    }
    if others.len() > 1 {
        return Intent::MultiTargetRequest;
    }

    match others.into_iter().next() {
        Some(target) => Intent::AnalysisRequest {
            target: target.to_string(),
        },
        None => Intent::NoTarget,
    }
}

fn is_handle_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Pulls `@handle` references out of free text, in order of appearance.
///
/// An `@` preceded by a handle character (as in an e-mail address) does not
/// start a mention.
pub fn extract_handles(text: &str) -> Vec<String> {
    let mut handles = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == '@' && !prev.map_or(false, is_handle_char) {
            let start = idx + c.len_utf8();
            let mut end = start;
            while let Some(&(next_idx, next)) = chars.peek() {
                if !is_handle_char(next) {
                    break;
                }
                end = next_idx + next.len_utf8();
                chars.next();
            }
            if end > start {
                handles.push(text[start..end].to_string());
            }
            prev = text[..end].chars().next_back();
            continue;
        }
        prev = Some(c);
    }

    handles
}

impl From<ApiStatus> for Mention {
    fn from(status: ApiStatus) -> Self {
        let mentioned_handles = match status.entities {
            Some(entities) => entities
                .user_mentions
                .into_iter()
                .map(|m| m.screen_name)
                .collect(),
            None => extract_handles(&status.text),
        };
        Mention {
            id: status.id,
            text: status.text,
            author: status.user.screen_name,
            mentioned_handles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_handles_in_order() {
        assert_eq!(
            extract_handles("@bot analyze @carol_99 please"),
            vec!["bot".to_string(), "carol_99".to_string()]
        );
    }

    #[test]
    fn test_extract_handles_skips_emails_and_bare_at() {
        assert_eq!(extract_handles("mail me at a@b.com or @ here"), Vec::<String>::new());
        assert_eq!(extract_handles("(@dave)"), vec!["dave".to_string()]);
    }
}
