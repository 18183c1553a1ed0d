use std::fmt;

use url::Url;

/// A GitHub issue addressed by URL: `https://github.com/{owner}/{repo}/issues/{number}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IssueUrlError {
    #[error("not a valid URL")]
    Malformed,
    #[error("URL must use http or https")]
    Scheme,
    #[error("URL must point to github.com")]
    Host,
    #[error("URL must have the form https://github.com/<owner>/<repo>/issues/<number>")]
    Path,
}

impl IssueRef {
    pub fn parse(raw: &str) -> Result<Self, IssueUrlError> {
        let url = Url::parse(raw.trim()).map_err(|_| IssueUrlError::Malformed)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IssueUrlError::Scheme);
        }
        if !matches!(url.host_str(), Some("github.com" | "www.github.com")) {
            return Err(IssueUrlError::Host);
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [owner, repo, "issues", number] => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number: number.parse().map_err(|_| IssueUrlError::Path)?,
            }),
            _ => Err(IssueUrlError::Path),
        }
    }

    /// `owner/repo`, the form MCP wiki tools take as `repoName`.
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}
