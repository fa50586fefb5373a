//! Mention resolution for praise command text.
//!
//! Two mention shapes arrive from Slack. Text typed in the message box is
//! converted by the platform to `<@U0123ABCD>`; those ids are verified
//! against the directory and must belong to active users. Text pasted or
//! escaped differently keeps its raw `@name` form; those are resolved
//! against the member listing by username, real name, display name, or
//! any single word of the real name, case-insensitively.
//!
//! A directory failure while resolving one token demotes that token to
//! "not a mention" (logged) instead of failing the whole command; the
//! orchestrator then rejects the request only if nothing resolved at all.

use tracing::warn;

use kudos_core::UserId;

use crate::api::DirectoryClient;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMention {
    pub user_id: UserId,
    /// Canonical `<@ID>` form used when rendering notifications.
    pub mention: String,
    /// Byte offset just past the mention in the source text.
    pub end: usize,
}

/// Scans `text` left to right for resolvable mentions. Unresolvable `@`
/// tokens are skipped one byte at a time, matching how a human reads past
/// stray at-signs in prose.
pub async fn parse_mentions<D>(text: &str, directory: &D) -> Vec<ResolvedMention>
where
    D: DirectoryClient + ?Sized,
{
    let mut mentions = Vec::new();
    let mut pos = 0usize;

    while let Some(offset) = text[pos..].find('@') {
        let mention_start = pos + offset;
        match parse_single_mention(text, mention_start, directory).await {
            Some(mention) => {
                pos = mention.end;
                mentions.push(mention);
            }
            None => pos = mention_start + 1,
        }
    }

    mentions
}

/// The praise message is everything after the last mention.
pub fn praise_message(text: &str, last_mention_end: usize) -> &str {
    text.get(last_mention_end..).unwrap_or("").trim()
}

async fn parse_single_mention<D>(
    text: &str,
    start: usize,
    directory: &D,
) -> Option<ResolvedMention>
where
    D: DirectoryClient + ?Sized,
{
    // Slack-converted format: <@U0123ABCD>
    if start > 0 && text.as_bytes()[start - 1] == b'<' {
        if let Some(end_bracket) = text[start..].find('>').map(|index| start + index) {
            let user_id = text[start + 1..end_bracket].trim();
            if !user_id.is_empty() && verify_user(directory, user_id).await {
                return Some(ResolvedMention {
                    user_id: UserId(user_id.to_owned()),
                    mention: text[start - 1..=end_bracket].to_owned(),
                    end: end_bracket + 1,
                });
            }
        }
    }

    // Raw @name mention; must be followed by a space so the praise message
    // itself stays intact.
    if let Some(next_space) = text[start..].find(' ').map(|index| start + index) {
        let username = text[start + 1..next_space].trim();
        if !username.is_empty() {
            if let Some(user_id) = find_user_by_name(directory, username).await {
                return Some(ResolvedMention {
                    mention: format!("<@{user_id}>"),
                    user_id: UserId(user_id),
                    end: next_space,
                });
            }
        }
    }

    None
}

async fn verify_user<D>(directory: &D, user_id: &str) -> bool
where
    D: DirectoryClient + ?Sized,
{
    match directory.lookup_user(user_id).await {
        Ok(info) => info.active,
        Err(error) => {
            warn!(
                event_name = "mentions.lookup_failed",
                user_id,
                error = %error,
                "directory lookup failed; treating token as unresolved"
            );
            false
        }
    }
}

async fn find_user_by_name<D>(directory: &D, username: &str) -> Option<String>
where
    D: DirectoryClient + ?Sized,
{
    let members = match directory.list_users().await {
        Ok(members) => members,
        Err(error) => {
            warn!(
                event_name = "mentions.listing_failed",
                username,
                error = %error,
                "member listing failed; treating token as unresolved"
            );
            return None;
        }
    };

    let needle = username.to_lowercase();
    members
        .into_iter()
        .find(|member| {
            member.name.to_lowercase() == needle
                || member.real_name.to_lowercase() == needle
                || member.display_name.to_lowercase() == needle
                || member.real_name.to_lowercase().split_whitespace().any(|word| word == needle)
        })
        .map(|member| member.id)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{parse_mentions, praise_message};
    use crate::api::{CollaboratorError, DirectoryClient, MemberRecord, UserInfo};
    use kudos_core::UserId;

    struct ScriptedDirectory {
        members: Vec<MemberRecord>,
        inactive: Vec<String>,
        fail_lookups: bool,
    }

    impl ScriptedDirectory {
        fn with_members(members: Vec<MemberRecord>) -> Self {
            Self { members, inactive: Vec::new(), fail_lookups: false }
        }
    }

    #[async_trait]
    impl DirectoryClient for ScriptedDirectory {
        async fn lookup_user(&self, user_id: &str) -> Result<UserInfo, CollaboratorError> {
            if self.fail_lookups {
                return Err(CollaboratorError::Directory("directory offline".to_owned()));
            }
            let known = self.members.iter().any(|member| member.id == user_id);
            if !known {
                return Err(CollaboratorError::Directory(format!("no such user {user_id}")));
            }
            Ok(UserInfo {
                id: user_id.to_owned(),
                active: !self.inactive.iter().any(|inactive| inactive == user_id),
                display_name: user_id.to_owned(),
            })
        }

        async fn list_users(&self) -> Result<Vec<MemberRecord>, CollaboratorError> {
            if self.fail_lookups {
                return Err(CollaboratorError::Directory("directory offline".to_owned()));
            }
            Ok(self.members.clone())
        }
    }

    fn member(id: &str, name: &str, real_name: &str, display_name: &str) -> MemberRecord {
        MemberRecord {
            id: id.to_owned(),
            name: name.to_owned(),
            real_name: real_name.to_owned(),
            display_name: display_name.to_owned(),
        }
    }

    #[tokio::test]
    async fn resolves_platform_converted_mentions() {
        let directory =
            ScriptedDirectory::with_members(vec![member("U2", "jdoe", "Jane Doe", "janey")]);
        let text = "<@U2> great work on the launch";

        let mentions = parse_mentions(text, &directory).await;
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].user_id, UserId::from("U2"));
        assert_eq!(mentions[0].mention, "<@U2>");
        assert_eq!(praise_message(text, mentions[0].end), "great work on the launch");
    }

    #[tokio::test]
    async fn resolves_raw_name_mentions_by_any_name_variant() {
        let directory = ScriptedDirectory::with_members(vec![
            member("U2", "jdoe", "Jane Doe", "janey"),
            member("U3", "bsmith", "Bob Smith", ""),
        ]);

        // Username, display name, and a single real-name word all resolve.
        for text in ["@jdoe thanks", "@janey thanks", "@Jane thanks", "@doe thanks"] {
            let mentions = parse_mentions(text, &directory).await;
            assert_eq!(mentions.len(), 1, "`{text}` should resolve");
            assert_eq!(mentions[0].user_id, UserId::from("U2"));
            assert_eq!(mentions[0].mention, "<@U2>");
        }
    }

    #[tokio::test]
    async fn resolves_multiple_mentions_and_extracts_trailing_message() {
        let directory = ScriptedDirectory::with_members(vec![
            member("U2", "jdoe", "Jane Doe", "janey"),
            member("U3", "bsmith", "Bob Smith", ""),
        ]);
        let text = "<@U2> @bsmith shipped the migration together";

        let mentions = parse_mentions(text, &directory).await;
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[1].user_id, UserId::from("U3"));
        assert_eq!(
            praise_message(text, mentions[1].end),
            "shipped the migration together"
        );
    }

    #[tokio::test]
    async fn inactive_and_unknown_users_do_not_resolve() {
        let mut directory =
            ScriptedDirectory::with_members(vec![member("U2", "jdoe", "Jane Doe", "janey")]);
        directory.inactive.push("U2".to_owned());

        assert!(parse_mentions("<@U2> hi", &directory).await.is_empty());
        assert!(parse_mentions("<@U404> hi", &directory).await.is_empty());
        assert!(parse_mentions("@nobody hi", &directory).await.is_empty());
    }

    #[tokio::test]
    async fn trailing_raw_mention_without_a_space_does_not_resolve() {
        let directory =
            ScriptedDirectory::with_members(vec![member("U2", "jdoe", "Jane Doe", "janey")]);
        assert!(parse_mentions("@jdoe", &directory).await.is_empty());
    }

    #[tokio::test]
    async fn stray_at_signs_are_skipped_without_stalling() {
        let directory =
            ScriptedDirectory::with_members(vec![member("U2", "jdoe", "Jane Doe", "janey")]);
        let text = "email me @ noon, and thank @jdoe for the café run";

        let mentions = parse_mentions(text, &directory).await;
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].user_id, UserId::from("U2"));
    }

    #[tokio::test]
    async fn directory_failure_demotes_tokens_instead_of_erroring() {
        let mut directory =
            ScriptedDirectory::with_members(vec![member("U2", "jdoe", "Jane Doe", "janey")]);
        directory.fail_lookups = true;

        assert!(parse_mentions("<@U2> @jdoe hi", &directory).await.is_empty());
    }
}
