pub mod brands;
pub mod health;
pub mod multipart;
pub mod sign_s3;
