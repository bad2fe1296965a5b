pub mod guards;
pub mod password;
pub mod token;
