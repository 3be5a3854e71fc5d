pub mod batch_create_user;
pub mod traits;
pub mod utils;
