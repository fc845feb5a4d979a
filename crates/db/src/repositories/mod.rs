//! Repositories wrapping every database query.

mod comment;
mod follow;
mod group;
mod post;
mod user;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use group::GroupRepository;
pub use post::{PostFilter, PostRepository};
pub use user::UserRepository;
