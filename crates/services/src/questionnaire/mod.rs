mod controller;
mod issued;
mod progress;

// Public API of the questionnaire subsystem.
pub use crate::error::QuestionnaireError;
pub use controller::SessionController;
pub use issued::IssuedQuestion;
pub use progress::SessionProgress;
