#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod questionnaire;

pub use slinky_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, QuestionnaireError};
pub use questionnaire::{IssuedQuestion, SessionController, SessionProgress};
