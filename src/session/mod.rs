pub mod diagnostic;
pub mod mistake_retry;
pub mod mock_exam;
pub mod quiz;
