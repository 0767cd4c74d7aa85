pub mod bank;
pub mod provider;
pub mod request;
pub mod selector;

pub use bank::QuestionBank;
pub use provider::{AdviceProvider, LocalProvider, QuestionProvider};
