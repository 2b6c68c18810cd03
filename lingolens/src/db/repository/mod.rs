mod translations;

pub use translations::TranslationRepository;
