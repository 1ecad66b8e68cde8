//! GitHub REST tools - repository summary and issue listing

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use tracing::debug;

use super::http;
use crate::config::GithubConfig;
use crate::pipeline::{FieldRule, ToolSchema};
use crate::tools::{Arguments, Tool, ToolError};

fn owner_repo_schema() -> ToolSchema {
    ToolSchema::new()
        .field(
            "owner",
            FieldRule::string()
                .required()
                .min_length(1)
                .max_length(39)
                .describe("Repository owner (user or organization)"),
        )
        .field(
            "repo",
            FieldRule::string()
                .required()
                .min_length(1)
                .max_length(100)
                .describe("Repository name"),
        )
}

/// GET a path under the configured API base, with auth when a token is set
fn get(config: &GithubConfig, path: &str) -> Result<RequestBuilder, ToolError> {
    let url = format!("{}{}", config.base_url.trim_end_matches('/'), path);
    debug!(%url, "github::get: called");
    let mut request = http::client(config.timeout_ms)?
        .get(url)
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28");
    if let Some(token) = http::optional_env(&config.token_env) {
        request = request.bearer_auth(token);
    }
    Ok(request)
}

#[derive(Debug, Deserialize)]
struct RepoArgs {
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct Repo {
    full_name: String,
    description: Option<String>,
    html_url: String,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    default_branch: String,
    language: Option<String>,
    #[serde(default)]
    archived: bool,
}

fn format_repo(repo: &Repo) -> String {
    let mut lines = vec![format!("{} ({})", repo.full_name, repo.html_url)];
    if let Some(d) = repo.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(d.to_string());
    }
    lines.push(format!(
        "stars: {}  forks: {}  open issues: {}",
        repo.stargazers_count, repo.forks_count, repo.open_issues_count
    ));
    lines.push(format!(
        "default branch: {}  language: {}",
        repo.default_branch,
        repo.language.as_deref().unwrap_or("unknown")
    ));
    if repo.archived {
        lines.push("archived".to_string());
    }
    lines.join("\n")
}

/// Summarize a GitHub repository
pub struct GithubRepoTool {
    config: GithubConfig,
}

impl GithubRepoTool {
    pub fn new(config: GithubConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for GithubRepoTool {
    fn name(&self) -> &'static str {
        "github_repo"
    }

    fn description(&self) -> &'static str {
        "Summarize a GitHub repository: description, stars, forks, open issues, default branch."
    }

    fn schema(&self) -> Option<ToolSchema> {
        Some(owner_repo_schema())
    }

    async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
        let args: RepoArgs = args.parse()?;
        debug!(owner = %args.owner, repo = %args.repo, "GithubRepoTool::execute: called");

        let response = get(&self.config, &format!("/repos/{}/{}", args.owner, args.repo))?
            .send()
            .await?;
        let repo: Repo = http::decode_json(response, "GitHub").await?;
        Ok(format_repo(&repo))
    }
}

#[derive(Debug, Deserialize)]
struct IssuesArgs {
    owner: String,
    repo: String,
    #[serde(default = "default_state")]
    state: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_state() -> String {
    "open".to_string()
}

fn default_limit() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    state: String,
    user: Option<IssueUser>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueUser {
    login: String,
}

/// Format issues one per line, skipping pull requests the API mixes in
fn format_issues(issues: &[Issue]) -> String {
    let lines: Vec<String> = issues
        .iter()
        .filter(|i| i.pull_request.is_none())
        .map(|i| match &i.user {
            Some(u) => format!("#{} [{}] {} (@{})", i.number, i.state, i.title, u.login),
            None => format!("#{} [{}] {}", i.number, i.state, i.title),
        })
        .collect();

    if lines.is_empty() {
        "No issues found".to_string()
    } else {
        lines.join("\n")
    }
}

/// List issues of a GitHub repository
pub struct GithubIssuesTool {
    config: GithubConfig,
}

impl GithubIssuesTool {
    pub fn new(config: GithubConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for GithubIssuesTool {
    fn name(&self) -> &'static str {
        "github_issues"
    }

    fn description(&self) -> &'static str {
        "List issues of a GitHub repository, excluding pull requests."
    }

    fn schema(&self) -> Option<ToolSchema> {
        Some(
            owner_repo_schema()
                .field(
                    "state",
                    FieldRule::string()
                        .one_of(["open", "closed", "all"])
                        .describe("Issue state filter"),
                )
                .field(
                    "limit",
                    FieldRule::number().min(1.0).max(100.0).describe("Maximum issues to return"),
                ),
        )
    }

    async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
        let args: IssuesArgs = args.parse()?;
        debug!(owner = %args.owner, repo = %args.repo, state = %args.state, "GithubIssuesTool::execute: called");

        let path = format!("/repos/{}/{}/issues", args.owner, args.repo);
        let per_page = args.limit.to_string();
        let response = get(&self.config, &path)?
            .query(&[("state", args.state.as_str()), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let issues: Vec<Issue> = http::decode_json(response, "GitHub").await?;
        Ok(format_issues(&issues))
    }
}
