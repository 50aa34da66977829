use eris_types::archive::{ArchivedMessage, MessageKind, Profile};
use eris_types::destination::{DestinationChannel, OutgoingMessage};

use crate::identity::{MemberDirectory, resolve_display_name, rewrite_mentions};

/// Body used when a record has no text. Discord rejects empty content.
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "*(empty message)*";

/// Turn one archived record into a webhook payload. Never fails: unknown
/// subtypes render like ordinary messages.
pub fn render(
    message: &ArchivedMessage,
    members: &MemberDirectory,
    channel: &DestinationChannel,
) -> OutgoingMessage {
    match message.kind() {
        MessageKind::ChannelJoin => render_join(message, members, channel),
        MessageKind::Ordinary | MessageKind::Unhandled => render_text(message, members),
    }
}

fn render_join(
    message: &ArchivedMessage,
    members: &MemberDirectory,
    channel: &DestinationChannel,
) -> OutgoingMessage {
    // Join records usually carry no embedded profile; the directory is the
    // better source here.
    let profile = sender_profile(message, members, true);
    OutgoingMessage {
        username: resolve_display_name(&profile),
        avatar_url: profile.avatar_url().map(str::to_owned),
        content: format!("*joined <#{}>*", channel.id),
    }
}

fn render_text(message: &ArchivedMessage, members: &MemberDirectory) -> OutgoingMessage {
    let profile = sender_profile(message, members, false);
    let content = match message.text.as_deref() {
        Some(text) if !text.trim().is_empty() => rewrite_mentions(text, members),
        _ => EMPTY_MESSAGE_PLACEHOLDER.to_string(),
    };
    OutgoingMessage {
        username: resolve_display_name(&profile),
        avatar_url: profile.avatar_url().map(str::to_owned),
        content,
    }
}

fn sender_profile(
    message: &ArchivedMessage,
    members: &MemberDirectory,
    prefer_directory: bool,
) -> Profile {
    let embedded = message.user_profile.as_ref();
    let listed = message.user.as_deref().and_then(|id| members.profile(id));
    let (first, second) = if prefer_directory {
        (listed, embedded)
    } else {
        (embedded, listed)
    };
    first.or(second).cloned().unwrap_or_default()
}
