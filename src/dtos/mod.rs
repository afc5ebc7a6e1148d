pub mod auth_dtos;
pub mod post_dtos;
pub mod tag_dtos;
// alias so handlers can say `crate::dtos::auth`
pub use auth_dtos as auth;
