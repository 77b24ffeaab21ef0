//! PostgreSQL repository implementations

mod bookmark;
mod document;
mod health;
mod note;
mod subscription;
mod user;
mod webhook_event;

pub use bookmark::PgBookmarkRepository;
pub use document::PgDocumentRepository;
pub use health::PgHealthCheck;
pub use note::PgNoteRepository;
pub use subscription::PgSubscriptionRepository;
pub use user::PgUserRepository;
pub use webhook_event::PgWebhookEventRepository;

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`
pub(crate) fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern(r"c:\docs"), r"%c:\\docs%");
    }
}
