pub mod advice;
pub mod progress;
pub mod question;
pub mod scoring;
pub mod topic;

pub use progress::{AnswerMode, UserStats};
pub use question::Question;
pub use topic::{Difficulty, Topic};
