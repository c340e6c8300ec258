pub mod driver;
pub mod error;
pub mod input;
pub mod layout;
pub mod logger;
pub mod ocr;
pub mod pause;
pub mod phases;
pub mod platform;
pub mod settings;
pub mod sleep;
pub mod types;
pub mod vision;

#[cfg(test)]
mod testing;
