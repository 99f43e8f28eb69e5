/// Clean free-text input using the ammonia library.
///
/// Announcement messages and incident descriptions are written by one role
/// and rendered verbatim to the other, so they pass through a
/// whitelist-based sanitizer first: safe tags survive, `<script>`/`<iframe>`
/// and event-handler attributes do not.
///
/// This is a fail-safe against stored XSS; the hosted service applies no
/// content filtering of its own.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input)
}
