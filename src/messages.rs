//! Every reply the bot sends lives here so wording stays in one place.

pub const GREETING: &str =
    "👋 Hi! Send me any message, photo, or video — I'll translate the text to English \
     and post it to all connected channels after you confirm.";

pub const NOT_AUTHORIZED: &str = "⛔ Sorry, you are not allowed to use this bot.";

pub const UNSUPPORTED: &str = "⚠️ Unsupported message type. Please send text, photo, or video.";

pub const NOTHING_PENDING: &str = "There is nothing waiting for confirmation.";

pub const CANCELLED: &str = "❌ Discarded. Nothing was posted.";

pub const EDIT_ACK: &str = "✏️ Text updated. Post it now?";

pub const CONFIRM_BUTTON_YES: &str = "✅ Yes, post it";
pub const CONFIRM_BUTTON_NO: &str = "❌ No, discard";

pub fn confirm_prompt(text: &str, channel_count: usize) -> String {
    format!(
        "Post this to {channel_count} channel(s)?\n\n{text}\n\nReply \"yes\" to post, \
         \"no\" to discard, or send new text to replace it."
    )
}

pub fn posted_all(delivered: usize) -> String {
    format!("✅ Sent to all {delivered} channel(s)!")
}

pub fn posted_partial(delivered: usize, failed: usize) -> String {
    format!("⚠️ Sent to {delivered} channel(s), {failed} failed. Check the logs.")
}
