/// Contains [`Rule`], a single lazily-fetched subreddit rule.
///
/// [`Rule`]: crate::rule::Rule
pub mod rule;

/// Contains [`SubredditRules`], the cached rule listing of a subreddit.
///
/// [`SubredditRules`]: crate::rules::SubredditRules
pub mod rules;

use serde::Deserialize;

use crate::{error::Error, result::Result};
use self::rule::RuleData;

/// Listing payload of `GET r/{subreddit}/about/rules.json`.
///
/// The endpoint also carries site-wide rules; only the subreddit's own
/// listing is kept.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RulesPage {
    pub(crate) rules: Vec<RuleData>,
}

/// Reply envelope of the `api_type=json` write endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReply {
    json: ApiJson,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiJson {
    #[serde(default)]
    errors: Vec<ApiTriple>,
    #[serde(default)]
    data: Option<RulesFragment>,
}

/// Server error entry: `[code, message, field]`, field may be null.
#[derive(Debug, Clone, Deserialize)]
struct ApiTriple(String, String, Option<String>);

#[derive(Debug, Clone, Deserialize)]
struct RulesFragment {
    #[serde(default)]
    rules: Vec<RuleData>,
}

impl ApiReply {
    /// Promotes a server-reported error triple to [`Error::Api`].
    pub(crate) fn check(self) -> Result<ApiReply> {
        match self.json.errors.first() {
            Some(ApiTriple(code, message, field)) => Err(Error::Api {
                code: code.clone(),
                message: message.clone(),
                field: field.clone(),
            }),
            None => Ok(self),
        }
    }

    pub(crate) fn into_rules(self) -> Vec<RuleData> {
        self.json.data.map(|data| data.rules).unwrap_or_default()
    }

    pub(crate) fn into_rule(self) -> Result<RuleData> {
        self.into_rules()
            .into_iter()
            .next()
            .ok_or(Error::MalformedReply("reply carried no rule"))
    }
}
