//! Secret handling shared by Wi-Fi credentials and meter encryption keys.

mod secret;

pub use secret::SecretString;
