pub mod error;
pub mod geo;
pub mod i18n;
pub mod media;
pub mod pagination;
pub mod validation;
