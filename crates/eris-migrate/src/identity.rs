use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use eris_types::archive::{Member, Profile};

/// Name used whenever nothing better is known about a member.
pub const PLACEHOLDER_NAME: &str = "Slack User";

/// `<@U123ABC>` or `<@U123ABC|label>`.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<@([A-Za-z0-9]+)(?:\|[^>]*)?>").expect("mention pattern is valid")
});

/// Display name, then real name, then the placeholder.
pub fn resolve_display_name(profile: &Profile) -> String {
    profile
        .display_name()
        .or_else(|| profile.real_name())
        .unwrap_or(PLACEHOLDER_NAME)
        .to_string()
}

/// Member directory indexed by id. Built once per run.
#[derive(Debug, Default)]
pub struct MemberDirectory {
    by_id: HashMap<String, Member>,
}

impl MemberDirectory {
    pub fn new(members: Vec<Member>) -> Self {
        let by_id = members.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Member> {
        self.by_id.get(id)
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.get(id).map(|m| &m.profile)
    }

    pub fn display_name(&self, id: &str) -> String {
        self.profile(id)
            .map(resolve_display_name)
            .unwrap_or_else(|| PLACEHOLDER_NAME.to_string())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Replace every inline user mention with `@<display name>`. Unknown ids
/// become `@Slack User`.
pub fn rewrite_mentions(text: &str, members: &MemberDirectory) -> String {
    MENTION
        .replace_all(text, |caps: &Captures| format!("@{}", members.display_name(&caps[1])))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(display: Option<&str>, real: Option<&str>) -> Profile {
        Profile {
            display_name: display.map(Into::into),
            real_name: real.map(Into::into),
            ..Profile::default()
        }
    }

    fn directory() -> MemberDirectory {
        MemberDirectory::new(vec![
            Member {
                id: "U01".into(),
                profile: profile(Some("ada"), Some("Ada Lovelace")),
            },
            Member {
                id: "U02".into(),
                profile: profile(Some(""), Some("Charles Babbage")),
            },
        ])
    }

    #[test]
    fn display_name_fallback_order() {
        assert_eq!(resolve_display_name(&profile(Some("ada"), Some("Ada L"))), "ada");
        assert_eq!(resolve_display_name(&profile(None, Some("Ada L"))), "Ada L");
        assert_eq!(resolve_display_name(&Profile::default()), PLACEHOLDER_NAME);
    }

    #[test]
    fn rewrites_known_and_unknown_mentions() {
        let members = directory();
        let out = rewrite_mentions("hey <@U01> and <@U02|charles>, ask <@U99>", &members);
        assert_eq!(out, "hey @ada and @Charles Babbage, ask @Slack User");
    }

    #[test]
    fn leaves_other_tokens_alone() {
        let members = directory();
        let text = "see <#C123|general> and <https://example.com> <!here>";
        assert_eq!(rewrite_mentions(text, &members), text);
    }
}
