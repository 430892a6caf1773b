mod article;
mod category;
mod unit;
mod user;

pub use article::*;
pub use category::*;
pub use unit::*;
pub use user::*;
