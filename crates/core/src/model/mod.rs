mod answer;
pub mod catalog;
mod ids;
pub mod question;
mod session;

pub use answer::{Answer, AnswerError};
pub use catalog::{CatalogError, QuestionCatalog};
pub use ids::{ParseIdError, SessionId};
pub use question::{AnswerOption, InputKind, Question, QuestionInput};
pub use session::{Session, SessionState, SessionStateError};
