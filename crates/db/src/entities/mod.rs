//! Database entities.

pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

pub use comment::Entity as Comment;
pub use follow::Entity as Follow;
pub use group::Entity as Group;
pub use post::Entity as Post;
pub use user::Entity as User;

/// Truncate text to its first `max` characters for display.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
