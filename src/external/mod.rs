//! External API integrations

pub mod mail;
pub mod weather;

pub use mail::MailClient;
pub use weather::WeatherClient;
