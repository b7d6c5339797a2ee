pub mod dictionary;
pub mod loyalty;

pub use dictionary::DictionaryClient;
pub use loyalty::LoyaltyService;
