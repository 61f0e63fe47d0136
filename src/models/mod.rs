mod filters;
mod manga;
mod token;
mod user;

pub use filters::{Filters, MANGA_SORT_SAFELIST, Metadata};
pub use manga::{Manga, validate_manga};
pub use token::{Token, TokenScope, hash_token, validate_token_plaintext};
pub use user::{User, password, validate_email, validate_password_plaintext, validate_user};
