//! Built-in tools

mod ask_question;
mod fetch_url;
mod generate_image;
mod github;
mod http;
mod system_stats;

pub use ask_question::AskQuestionTool;
pub use fetch_url::FetchUrlTool;
pub use generate_image::GenerateImageTool;
pub use github::{GithubIssuesTool, GithubRepoTool};
pub use system_stats::SystemStatsTool;
