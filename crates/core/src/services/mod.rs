//! Business logic services.

pub mod comment;
pub mod follow;
pub mod group;
pub mod media;
pub mod post;
pub mod user;

pub use comment::CommentService;
pub use follow::{FollowOutcome, FollowService};
pub use group::{CreateGroupInput, GroupService};
pub use media::{ImageUpload, MediaService, ValidatedImage, validate_image};
pub use post::{
    CommentForm, CommentView, FollowPage, GroupPage, IndexPage, PostDetailPage, PostForm,
    PostFormPage, PostInput, PostService, PostView, ProfilePage,
};
pub use user::{SignupInput, UserService};
